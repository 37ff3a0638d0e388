use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
    },
    config::Config,
    error::ServiceError,
    form::{validate_password, RegistrationForm, SetPasswordForm},
    pagination::{PageContext, PageQuery},
    schema::{Id, User, UserRow},
    views::UserView,
};

use sqlx::{Pool, Postgres};

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, ServiceError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ServiceError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn require_user(pool: &Pool<Postgres>, user_id: Id) -> Result<User, ServiceError> {
    get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} doesn't exist")))
}

pub async fn is_subscribed(
    follower: Option<&SessionData>,
    following_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ServiceError> {
    let Some(follower) = follower else {
        return Ok(false);
    };

    let row: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM subscriptions WHERE user_id = $1 AND following_id = $2")
            .bind(follower.user_id)
            .bind(following_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn user_view(
    user: User,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserView, ServiceError> {
    let subscribed = is_subscribed(principal, user.id, pool).await?;
    Ok(UserView::from_user(user, subscribed))
}

pub async fn get_user_view(
    user_id: Id,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserView, ServiceError> {
    let user = require_user(pool, user_id).await?;
    user_view(user, principal, pool).await
}

pub async fn get_me(session: &SessionData, pool: &Pool<Postgres>) -> Result<UserView, ServiceError> {
    get_user_view(session.user_id, Some(session), pool).await
}

pub async fn fetch_users(
    page: PageQuery,
    principal: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserView>, ServiceError> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => {
            let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
            total.0
        }
    };
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(user_view(row.into(), principal, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}

/// Creates a user; the stored password is an argon2 hash.
pub async fn register_user(
    form: RegistrationForm,
    pool: &Pool<Postgres>,
) -> Result<UserView, ServiceError> {
    form.validate()?;
    let password = hash_password(&form.password)?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(form.normalized_email())
    .bind(form.username.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(UserView::from_user(user, false))
        }
        None => Err(ServiceError::AlreadyExists(String::from(
            "A user with that username or email already exists",
        ))),
    }
}

pub async fn login_user(
    username: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, ServiceError> {
    let invalid = || ServiceError::Unauthenticated(String::from("Invalid credentials"));

    let user = get_user(pool, username).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password)? {
        return Err(invalid());
    }

    generate_jwt_session(&user, config.jwt_secret.as_bytes(), config.session_hours)
}

pub async fn set_password(
    form: SetPasswordForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    validate_password(&form.new_password)?;

    let user = require_user(pool, session.user_id).await?;
    if !verify_password(&form.current_password, &user.password)? {
        return Err(ServiceError::validation(
            "current_password",
            "password is incorrect",
        ));
    }

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash_password(&form.new_password)?)
        .bind(user.id)
        .execute(pool)
        .await?;

    log::info!("User {} changed their password", user.id);
    Ok(())
}
