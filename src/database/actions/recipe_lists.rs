use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::ServiceError,
    jwt::SessionData,
    schema::Id,
    views::RecipeSummary,
};

use super::recipes::require_recipe;

/// Per-user recipe sets sharing one presence/absence toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn action(self) -> ActionType {
        match self {
            RecipeList::Favorites => ActionType::ManageOwnFavorites,
            RecipeList::ShoppingCart => ActionType::ManageOwnShoppingCart,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "the shopping cart",
        }
    }

    pub async fn contains(
        self,
        recipe_id: Id,
        principal: Option<&SessionData>,
        pool: &Pool<Postgres>,
    ) -> Result<bool, ServiceError> {
        let Some(session) = principal else {
            return Ok(false);
        };

        let row: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT id FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(session.user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }

    /// ABSENT -> PRESENT. A concurrent duplicate insert loses on the unique constraint and
    /// surfaces as `AlreadyExists` as well.
    pub async fn add(
        self,
        recipe_id: Id,
        session: &SessionData,
        pool: &Pool<Postgres>,
    ) -> Result<RecipeSummary, ServiceError> {
        session.authenticate(self.action())?;
        let recipe = require_recipe(recipe_id, pool).await?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.table()
        ))
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::AlreadyExists(format!(
                "Recipe is already in {}",
                self.label()
            )));
        }

        log::info!(
            "User {} added recipe {} to {}",
            session.user_id,
            recipe_id,
            self.table()
        );
        Ok(recipe.into())
    }

    /// PRESENT -> ABSENT.
    pub async fn remove(
        self,
        recipe_id: Id,
        session: &SessionData,
        pool: &Pool<Postgres>,
    ) -> Result<(), ServiceError> {
        session.authenticate(self.action())?;

        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!(
                "Recipe is not in {}",
                self.label()
            )));
        }

        log::info!(
            "User {} removed recipe {} from {}",
            session.user_id,
            recipe_id,
            self.table()
        );
        Ok(())
    }
}

pub async fn add_to_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ServiceError> {
    RecipeList::Favorites.add(recipe_id, session, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    RecipeList::Favorites.remove(recipe_id, session, pool).await
}

pub async fn is_favorite(
    recipe_id: Id,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<bool, ServiceError> {
    RecipeList::Favorites.contains(recipe_id, principal, pool).await
}

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ServiceError> {
    RecipeList::ShoppingCart.add(recipe_id, session, pool).await
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    RecipeList::ShoppingCart.remove(recipe_id, session, pool).await
}

pub async fn is_in_shopping_cart(
    recipe_id: Id,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<bool, ServiceError> {
    RecipeList::ShoppingCart.contains(recipe_id, principal, pool).await
}
