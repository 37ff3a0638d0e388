use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{EMAIL_MAX_LENGTH, NAME_MAX_LENGTH, RESERVED_USERNAMES, USERNAME_MAX_LENGTH},
    error::ServiceError,
    schema::Id,
};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmountForm {
    pub id: Id,
    pub amount: i32,
}

/// Write shape of a recipe, used by both create and update.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RecipeForm {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmountForm>,
}

impl RecipeForm {
    /// Rejects the form before anything touches storage.
    pub fn validate(&self) -> Result<(), ServiceError> {
        non_blank("name", &self.name, NAME_MAX_LENGTH)?;
        if self.text.trim().is_empty() {
            return Err(ServiceError::validation("text", "must not be empty"));
        }
        if self.image.trim().is_empty() {
            return Err(ServiceError::validation("image", "must not be empty"));
        }
        if self.cooking_time < 1 {
            return Err(ServiceError::validation(
                "cooking_time",
                "must be at least 1 minute",
            ));
        }

        if self.tags.is_empty() {
            return Err(ServiceError::validation("tags", "add at least one tag"));
        }
        let mut seen = HashSet::new();
        if !self.tags.iter().all(|id| seen.insert(*id)) {
            return Err(ServiceError::validation("tags", "tags must be unique"));
        }

        if self.ingredients.is_empty() {
            return Err(ServiceError::validation(
                "ingredients",
                "add at least one ingredient",
            ));
        }
        let mut seen = HashSet::new();
        for ingredient in self.ingredients.iter() {
            if ingredient.amount < 1 {
                return Err(ServiceError::validation(
                    "ingredients",
                    "amount must be at least 1",
                ));
            }
            if !seen.insert(ingredient.id) {
                return Err(ServiceError::validation(
                    "ingredients",
                    "an ingredient may appear only once",
                ));
            }
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<Id> {
        self.ingredients.iter().map(|i| i.id).collect()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ServiceError> {
        non_blank("username", &self.username, USERNAME_MAX_LENGTH)?;
        if RESERVED_USERNAMES.contains(&self.username.as_str()) {
            return Err(ServiceError::validation(
                "username",
                "this username is reserved",
            ));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "_.@+-".contains(c))
        {
            return Err(ServiceError::validation(
                "username",
                "only letters, digits and _.@+- are allowed",
            ));
        }

        non_blank("email", &self.email, EMAIL_MAX_LENGTH)?;
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(ServiceError::validation("email", "not a valid address")),
        }

        non_blank("first_name", &self.first_name, USERNAME_MAX_LENGTH)?;
        non_blank("last_name", &self.last_name, USERNAME_MAX_LENGTH)?;
        validate_password(&self.password)
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SetPasswordForm {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagForm {
    pub fn validate(&self) -> Result<(), ServiceError> {
        non_blank("name", &self.name, NAME_MAX_LENGTH)?;
        non_blank("slug", &self.slug, NAME_MAX_LENGTH)?;
        if !self
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ServiceError::validation(
                "slug",
                "only letters, digits, hyphens and underscores are allowed",
            ));
        }

        let hex = self.color.strip_prefix('#').unwrap_or("");
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ServiceError::validation("color", "expected #RRGGBB"));
        }

        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(&self) -> Result<(), ServiceError> {
        non_blank("name", &self.name, NAME_MAX_LENGTH)?;
        non_blank("measurement_unit", &self.measurement_unit, NAME_MAX_LENGTH)
    }
}

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < 8 {
        return Err(ServiceError::validation(
            "password",
            "must be at least 8 characters",
        ));
    }
    Ok(())
}

fn non_blank(field: &'static str, value: &str, max_length: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_length {
        return Err(ServiceError::Validation {
            field,
            message: format!("must be at most {max_length} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            name: String::from("Pancakes"),
            image: String::from("data:image/png;base64,AAAA"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmountForm { id: 10, amount: 200 },
                IngredientAmountForm { id: 11, amount: 2 },
            ],
        }
    }

    fn field_of(error: ServiceError) -> &'static str {
        match error {
            ServiceError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn complete_recipe_passes() {
        assert!(recipe_form().validate().is_ok());
    }

    #[test]
    fn empty_ingredients_are_rejected() {
        let mut form = recipe_form();
        form.ingredients.clear();

        assert_eq!(field_of(form.validate().unwrap_err()), "ingredients");
    }

    #[test]
    fn empty_tags_are_rejected() {
        let mut form = recipe_form();
        form.tags.clear();

        assert_eq!(field_of(form.validate().unwrap_err()), "tags");
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut form = recipe_form();
        form.ingredients[1].amount = 0;

        assert_eq!(field_of(form.validate().unwrap_err()), "ingredients");
    }

    #[test]
    fn repeated_ingredient_is_rejected() {
        let mut form = recipe_form();
        form.ingredients[1].id = 10;

        assert_eq!(field_of(form.validate().unwrap_err()), "ingredients");
    }

    #[test]
    fn non_positive_cooking_time_is_rejected() {
        let mut form = recipe_form();
        form.cooking_time = 0;

        assert_eq!(field_of(form.validate().unwrap_err()), "cooking_time");
    }

    #[test]
    fn reserved_username_is_rejected() {
        let form = RegistrationForm {
            email: String::from("me@example.com"),
            username: String::from("me"),
            first_name: String::from("Anna"),
            last_name: String::from("Virtanen"),
            password: String::from("correct horse"),
        };

        assert_eq!(field_of(form.validate().unwrap_err()), "username");
    }

    #[test]
    fn email_is_lowercased() {
        let form = RegistrationForm {
            email: String::from(" Anna@Example.COM "),
            username: String::from("anna"),
            first_name: String::from("Anna"),
            last_name: String::from("Virtanen"),
            password: String::from("correct horse"),
        };

        assert!(form.validate().is_ok());
        assert_eq!(form.normalized_email(), "anna@example.com");
    }

    #[test]
    fn tag_color_must_be_hex() {
        let form = TagForm {
            name: String::from("Breakfast"),
            color: String::from("red"),
            slug: String::from("breakfast"),
        };

        assert_eq!(field_of(form.validate().unwrap_err()), "color");
    }
}
