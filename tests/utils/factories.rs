/// Fixture builders. Every name carries a fresh uuid so tests never collide.
use foodgram_sdk::{
    actions::register_user,
    form::{IngredientAmountForm, RecipeForm, RegistrationForm},
    jwt::SessionData,
    schema::{Id, Ingredient, Tag, UserRole},
};
use sqlx::{Pool, Postgres};

pub const PNG_PAYLOAD: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub async fn user(pool: &Pool<Postgres>) -> SessionData {
    let username = unique("cook");
    let view = register_user(
        RegistrationForm {
            email: format!("{username}@example.com"),
            username: username.clone(),
            first_name: String::from("Test"),
            last_name: String::from("Cook"),
            password: String::from("correct horse"),
        },
        pool,
    )
    .await
    .unwrap();

    SessionData {
        user_id: view.id,
        username,
        role: UserRole::User,
    }
}

pub async fn tag(pool: &Pool<Postgres>) -> Tag {
    let slug = unique("tag");
    sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, '#00FF00', $1) RETURNING *")
        .bind(slug)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn ingredient(pool: &Pool<Postgres>, name: &str, unit: &str) -> Ingredient {
    sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *")
        .bind(name)
        .bind(unit)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn unique_name(prefix: &str) -> String {
    unique(prefix)
}

pub fn recipe_form(tags: &[Id], ingredients: &[(Id, i32)]) -> RecipeForm {
    RecipeForm {
        name: String::from("Pancakes"),
        image: PNG_PAYLOAD.to_string(),
        text: String::from("Mix and fry."),
        cooking_time: 20,
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmountForm { id, amount })
            .collect(),
    }
}
