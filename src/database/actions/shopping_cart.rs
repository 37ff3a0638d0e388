use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType, error::ServiceError, jwt::SessionData,
    schema::CartIngredientRow,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

impl fmt::Display for ShoppingListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {}",
            self.name, self.measurement_unit, self.total_amount
        )
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    /// Sums amounts per `(name, unit)` text. Distinct catalog rows sharing both are merged.
    /// Items come out sorted by name, then unit.
    pub fn aggregate(rows: impl IntoIterator<Item = CartIngredientRow>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        rows.into_iter().for_each(|row| {
            *totals
                .entry((row.name, row.measurement_unit))
                .or_insert(0) += i64::from(row.amount);
        });

        Self {
            items: totals
                .into_iter()
                .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
                    name,
                    measurement_unit,
                    total_amount,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.items
            .iter()
            .try_for_each(|item| writeln!(f, "{item}"))
    }
}

pub async fn list_cart_ingredients(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, ServiceError> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ir.amount AS amount
        FROM shopping_cart sc
        INNER JOIN ingredient_recipes ir ON ir.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ir.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn build_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, ServiceError> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let rows = list_cart_ingredients(session.user_id, pool).await?;
    let list = ShoppingList::aggregate(rows);

    log::trace!(
        "> Built shopping list for user {} ({} items)",
        session.user_id,
        list.items.len()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn total(list: &ShoppingList, name: &str) -> Option<i64> {
        list.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.total_amount)
    }

    #[test]
    fn amounts_are_summed_across_recipes() {
        // R1 = {flour: 100}, R2 = {flour: 50, salt: 5}
        let list = ShoppingList::aggregate(vec![
            row("flour", "g", 100),
            row("flour", "g", 50),
            row("salt", "g", 5),
        ]);

        assert_eq!(list.items.len(), 2);
        assert_eq!(total(&list, "flour"), Some(150));
        assert_eq!(total(&list, "salt"), Some(5));
    }

    #[test]
    fn same_name_in_other_unit_stays_separate() {
        let list = ShoppingList::aggregate(vec![row("milk", "ml", 200), row("milk", "cup", 1)]);

        assert_eq!(list.items.len(), 2);
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        let list = ShoppingList::aggregate(Vec::new());

        assert!(list.is_empty());
        assert!(list.to_bytes().is_empty());
    }

    #[test]
    fn rendering_has_one_line_per_group() {
        let list = ShoppingList::aggregate(vec![
            row("salt", "g", 5),
            row("flour", "g", 100),
            row("flour", "g", 50),
        ]);

        assert_eq!(list.to_string(), "flour (g) - 150\nsalt (g) - 5\n");
    }

    #[test]
    fn order_does_not_depend_on_input_order() {
        let a = ShoppingList::aggregate(vec![row("egg", "pcs", 2), row("butter", "g", 30)]);
        let b = ShoppingList::aggregate(vec![row("butter", "g", 30), row("egg", "pcs", 2)]);

        assert_eq!(a, b);
    }
}
