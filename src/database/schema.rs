use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, sqlx::Type, Serialize, Deserialize, Eq, Hash)]
#[sqlx(type_name = "tag_color", rename_all = "lowercase")]
pub enum TagColor {
    #[serde(rename = "#FFA500", alias = "orange")]
    Orange,
    #[serde(rename = "#008000", alias = "green")]
    Green,
    #[serde(rename = "#800080", alias = "purple")]
    Purple,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
}

/// A user ready for insertion; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: TagColor,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: TagColor,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    #[sqlx(flatten)]
    pub user: User,
    pub count: i64,
}

/// Ingredient of a recipe together with its amount.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Validated recipe contents written by create and update.
///
/// `image` is a stored media path; on update `None` keeps the current image.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub favorited_by: Option<Id>,
    pub in_cart_of: Option<Id>,
}

/// Per-user markings of a recipe, each stored as a unique (user, recipe) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeMark {
    Favorite,
    ShoppingCart,
}

impl RecipeMark {
    pub fn table(&self) -> &'static str {
        match self {
            RecipeMark::Favorite => "favorites",
            RecipeMark::ShoppingCart => "shopping_cart",
        }
    }

    pub fn already_marked(&self) -> &'static str {
        match self {
            RecipeMark::Favorite => "Recipe is already in favorites.",
            RecipeMark::ShoppingCart => "Recipe is already in the shopping cart.",
        }
    }

    pub fn not_marked(&self) -> &'static str {
        match self {
            RecipeMark::Favorite => "Recipe is not in favorites.",
            RecipeMark::ShoppingCart => "Recipe is not in the shopping cart.",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tag_colors_serialize_as_hex() {
        assert_eq!(serde_json::to_value(TagColor::Green).unwrap(), json!("#008000"));
        assert_eq!(
            serde_json::from_value::<TagColor>(json!("purple")).unwrap(),
            TagColor::Purple
        );
        assert!(serde_json::from_value::<TagColor>(json!("blue")).is_err());
    }
}
