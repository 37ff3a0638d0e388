use crate::{
    authentication::permissions::ActionType,
    error::ServiceError,
    form::TagForm,
    jwt::SessionData,
    schema::{Id, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(
    form: TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Tag, ServiceError> {
    form.validate()?;
    session.authenticate(ActionType::ManageCatalog)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&form.name)
    .bind(form.color.to_uppercase())
    .bind(&form.slug)
    .fetch_optional(pool)
    .await?;

    match tag {
        Some(tag) => {
            log::info!("Created tag {} ({})", tag.slug, tag.id);
            Ok(tag)
        }
        None => Err(ServiceError::AlreadyExists(format!(
            "Tag with slug `{}` already exists",
            form.slug
        ))),
    }
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Tag, ServiceError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    tag.ok_or_else(|| ServiceError::NotFound(format!("Tag {id} doesn't exist")))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ServiceError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}
