use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::ServiceError,
    form::RecipeForm,
    jwt::SessionData,
    media::image::{DecodedImage, MediaStorage},
    pagination::{PageContext, PageQuery},
    schema::{Id, Recipe, RecipeIngredient, RecipeRow, RecipeTagRow, Tag},
    views::{RecipeIngredientView, RecipeView},
};

use super::{
    recipe_lists::RecipeList,
    users::{require_user, user_view},
};

/// Filters accepted by [`fetch_recipes`]. Tag slugs match when a recipe has any of them.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

pub async fn get_recipe_row(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ServiceError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn require_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Recipe, ServiceError> {
    get_recipe_row(id, pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Recipe {id} doesn't exist")))
}

/// Loads a recipe for mutation; only its author passes.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ServiceError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = require_recipe(id, pool).await?;

    if recipe.author_id != session.user_id {
        return Err(ServiceError::PermissionDenied(String::from(
            "Only the author can modify this recipe",
        )));
    }

    Ok(recipe)
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, ServiceError> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ir.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ir.amount AS amount
        FROM ingredient_recipes ir
        INNER JOIN ingredients i ON i.id = ir.ingredient_id
        WHERE ir.recipe_id = $1
        ORDER BY ir.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, ServiceError> {
    let rows: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Tag::from).collect())
}

/// Builds the read shape of a recipe relative to `principal`.
pub async fn hydrate_recipe(
    recipe: Recipe,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ServiceError> {
    let author = require_user(pool, recipe.author_id).await?;
    let author = user_view(author, principal, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool)
        .await?
        .into_iter()
        .map(RecipeIngredientView::from)
        .collect();
    let is_favorited = RecipeList::Favorites
        .contains(recipe.id, principal, pool)
        .await?;
    let is_in_shopping_cart = RecipeList::ShoppingCart
        .contains(recipe.id, principal, pool)
        .await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

pub async fn get_recipe(
    id: Id,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ServiceError> {
    let recipe = require_recipe(id, pool).await?;
    hydrate_recipe(recipe, principal, pool).await
}

/// Newest recipes first.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    page: PageQuery,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, ServiceError> {
    let wants_user_list = filter.is_favorited || filter.is_in_shopping_cart;
    let user_id = match (wants_user_list, principal) {
        (true, None) => return Ok(PageContext::no_rows()),
        (_, session) => session.map(|s| s.user_id),
    };

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query, &filter, user_id);
    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(pool).await?;

    // Past the last page the window count has no row to ride on.
    let total_count = match rows.first() {
        Some(row) => row.count,
        None => {
            let mut count: QueryBuilder<Postgres> =
                QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
            push_recipe_filters(&mut count, &filter, user_id);
            let total: (i64,) = count.build_query_as().fetch_one(pool).await?;
            total.0
        }
    };
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(hydrate_recipe(row.into(), principal, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}

fn push_recipe_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    user_id: Option<Id>,
) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let (true, Some(user_id)) = (filter.is_favorited, user_id) {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let (true, Some(user_id)) = (filter.is_in_shopping_cart, user_id) {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

/// Creates a recipe with its tag set and ingredient list in a single transaction.
pub async fn create_recipe(
    form: RecipeForm,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ServiceError> {
    form.validate()?;
    session.authenticate(ActionType::CreateRecipes)?;
    let image = DecodedImage::parse(&form.image)?;
    let image = media.store_recipe_image(&image).await?;

    let recipe_id = match insert_recipe(&form, &image, session.user_id, pool).await {
        Ok(id) => id,
        Err(e) => {
            media.remove(&image).await;
            return Err(e);
        }
    };

    log::info!("User {} created recipe {}", session.user_id, recipe_id);
    get_recipe(recipe_id, Some(session), pool).await
}

async fn insert_recipe(
    form: &RecipeForm,
    image: &str,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Id, ServiceError> {
    let mut tr = pool.begin().await?;

    ensure_catalog_entries(&mut tr, form).await?;

    let recipe: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(form.name.trim())
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_relations(&mut tr, recipe.0, form).await?;

    tr.commit().await?;
    Ok(recipe.0)
}

/// Replaces the ingredient list and tag set, then the scalar fields. Validation happens
/// before anything is read or written.
pub async fn update_recipe(
    recipe_id: Id,
    form: RecipeForm,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ServiceError> {
    form.validate()?;
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;
    let image = DecodedImage::parse(&form.image)?;
    let image = media.store_recipe_image(&image).await?;

    if let Err(e) = replace_recipe(recipe_id, &form, &image, pool).await {
        media.remove(&image).await;
        return Err(e);
    }
    media.remove(&recipe.image).await;

    log::info!("User {} updated recipe {}", session.user_id, recipe_id);
    get_recipe(recipe_id, Some(session), pool).await
}

async fn replace_recipe(
    recipe_id: Id,
    form: &RecipeForm,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    let mut tr = pool.begin().await?;

    ensure_catalog_entries(&mut tr, form).await?;

    sqlx::query("DELETE FROM ingredient_recipes WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await?;

    insert_relations(&mut tr, recipe_id, form).await?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(form.name.trim())
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await?;

    // Deleted by a concurrent request after the ownership check.
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound(format!(
            "Recipe {recipe_id} doesn't exist"
        )));
    }

    tr.commit().await?;
    Ok(())
}

/// Deletes a recipe together with its junction, favorite and cart rows.
pub async fn delete_recipe(
    recipe_id: Id,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;

    let mut tr = pool.begin().await?;
    for table in [
        "ingredient_recipes",
        "recipe_tags",
        "favorites",
        "shopping_cart",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(recipe_id)
            .execute(&mut *tr)
            .await?;
    }
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await?;
    tr.commit().await?;

    media.remove(&recipe.image).await;
    log::info!("User {} deleted recipe {}", session.user_id, recipe_id);
    Ok(())
}

/// Fails with `NotFound` naming every tag or ingredient id that doesn't resolve.
async fn ensure_catalog_entries(
    tr: &mut Transaction<'_, Postgres>,
    form: &RecipeForm,
) -> Result<(), ServiceError> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(form.tags.as_slice())
        .fetch_all(&mut **tr)
        .await?;
    let missing = missing_ids(&form.tags, found.into_iter().map(|row| row.0));
    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "Tags don't exist: {}",
            join_ids(&missing)
        )));
    }

    let ingredient_ids = form.ingredient_ids();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids.as_slice())
        .fetch_all(&mut **tr)
        .await?;
    let missing = missing_ids(&ingredient_ids, found.into_iter().map(|row| row.0));
    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "Ingredients don't exist: {}",
            join_ids(&missing)
        )));
    }

    Ok(())
}

async fn insert_relations(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    form: &RecipeForm,
) -> Result<(), ServiceError> {
    let mut ingredients: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredient_recipes (recipe_id, ingredient_id, amount) ");
    ingredients.push_values(form.ingredients.iter(), |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    ingredients.build().execute(&mut **tr).await?;

    let mut tags: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tags.push_values(form.tags.iter(), |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    tags.build().execute(&mut **tr).await?;

    Ok(())
}

/// Requested ids absent from `found`, in request order.
fn missing_ids(requested: &[Id], found: impl IntoIterator<Item = Id>) -> Vec<Id> {
    let found: HashSet<Id> = found.into_iter().collect();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
