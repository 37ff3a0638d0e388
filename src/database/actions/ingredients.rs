use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::ServiceError,
    form::IngredientForm,
    jwt::SessionData,
    schema::{Id, Ingredient},
};

/// Lists the catalog. With a search term, names starting with it come before names that
/// merely contain it.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ServiceError> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            sqlx::query_as(
                "
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE name ILIKE '%' || $1 || '%'
                ORDER BY (name ILIKE $1 || '%') DESC, name, id
            ",
            )
            .bind(escape_like(name))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Ingredient, ServiceError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| ServiceError::NotFound(format!("Ingredient {id} doesn't exist")))
}

pub async fn create_ingredient(
    form: IngredientForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ServiceError> {
    form.validate()?;
    session.authenticate(ActionType::ManageCatalog)?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.measurement_unit.trim())
    .fetch_one(pool)
    .await?;

    log::info!(
        "Created ingredient {} ({})",
        ingredient.name,
        ingredient.id
    );
    Ok(ingredient)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("flour"), "flour");
    }
}
