use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::DEFAULT_RECIPES_LIMIT,
    error::ServiceError,
    jwt::SessionData,
    pagination::{PageContext, PageQuery},
    schema::{Id, Recipe, User, UserRow},
    views::{RecipeSummary, SubscriptionView, UserView},
};

use super::users::require_user;

fn ensure_not_self(session: &SessionData, author_id: Id) -> Result<(), ServiceError> {
    if session.user_id == author_id {
        return Err(ServiceError::InvalidOperation(String::from(
            "Cannot subscribe to self",
        )));
    }
    Ok(())
}

pub async fn subscription_view(
    author: User,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, ServiceError> {
    let limit = recipes_limit.unwrap_or(DEFAULT_RECIPES_LIMIT).max(0);

    let recipes: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author.id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(pool)
        .await?;

    Ok(SubscriptionView {
        user: UserView::from_user(author, true),
        recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
        recipes_count: count.0,
    })
}

pub async fn subscribe(
    author_id: Id,
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, ServiceError> {
    ensure_not_self(session, author_id)?;
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = require_user(pool, author_id).await?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::AlreadyExists(format!(
            "Already subscribed to {}",
            author.username
        )));
    }

    log::info!("User {} subscribed to {}", session.user_id, author_id);
    subscription_view(author, recipes_limit, pool).await
}

pub async fn unsubscribe(
    author_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND following_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound(String::from(
            "Not subscribed to this user",
        )));
    }

    log::info!("User {} unsubscribed from {}", session.user_id, author_id);
    Ok(())
}

/// Followed authors, each with their latest recipes.
pub async fn fetch_subscriptions(
    session: &SessionData,
    page: PageQuery,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, ServiceError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.following_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => {
            let total: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
                    .bind(session.user_id)
                    .fetch_one(pool)
                    .await?;
            total.0
        }
    };
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(subscription_view(row.into(), recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    #[test]
    fn self_subscription_is_invalid() {
        let session = SessionData {
            user_id: 4,
            username: String::from("anna"),
            role: UserRole::User,
        };

        assert!(matches!(
            ensure_not_self(&session, 4),
            Err(ServiceError::InvalidOperation(_))
        ));
        assert!(ensure_not_self(&session, 5).is_ok());
    }
}
