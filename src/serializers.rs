//! Client representations of stored rows.

use serde::Serialize;

use crate::error::{Error, HtmlError};
use crate::jwt::SessionData;
use crate::media::MediaStore;
use crate::schema::{Id, Recipe, RecipeIngredient, RecipeMark, Tag, User};
use crate::store::Store;

#[derive(Serialize, Debug, Clone)]
pub struct UserCreated {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserCreated {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct UserRead {
    #[serde(flatten)]
    pub user: UserCreated,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeRead {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub user: UserRead,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct TokenRead {
    pub auth_token: String,
}

/// `is_subscribed` is always false for anonymous viewers and for yourself.
pub async fn user_read(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    user: &User,
) -> Result<UserRead, Error> {
    let is_subscribed = match viewer {
        Some(viewer) if viewer.user_id() != user.id => {
            store.is_subscribed(viewer.user_id(), user.id).await?
        }
        _ => false,
    };

    Ok(UserRead {
        user: UserCreated::from(user),
        is_subscribed,
    })
}

pub fn short_recipe(media: &MediaStore, recipe: &Recipe) -> ShortRecipe {
    ShortRecipe {
        id: recipe.id,
        name: recipe.name.to_owned(),
        image: media.url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

pub async fn recipe_read(
    store: &dyn Store,
    media: &MediaStore,
    viewer: Option<&SessionData>,
    recipe: &Recipe,
) -> Result<RecipeRead, Error> {
    let author = store.get_user(recipe.author_id).await?.ok_or_else(|| {
        HtmlError::InternalServerError.new(&format!("Recipe {} has no author", recipe.id))
    })?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            store
                .has_mark(RecipeMark::Favorite, viewer.user_id(), recipe.id)
                .await?,
            store
                .has_mark(RecipeMark::ShoppingCart, viewer.user_id(), recipe.id)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeRead {
        id: recipe.id,
        tags: store.recipe_tags(recipe.id).await?,
        author: user_read(store, viewer, &author).await?,
        ingredients: store.recipe_ingredients(recipe.id).await?,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name.to_owned(),
        image: media.url(&recipe.image),
        text: recipe.text.to_owned(),
        cooking_time: recipe.cooking_time,
    })
}

/// An author as seen by a subscriber, with at most `recipes_limit` recipes.
pub async fn subscription_read(
    store: &dyn Store,
    media: &MediaStore,
    viewer: &SessionData,
    author: &User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionRead, Error> {
    let recipes = store
        .author_recipes(author.id, recipes_limit)
        .await?
        .iter()
        .map(|recipe| short_recipe(media, recipe))
        .collect();

    Ok(SubscriptionRead {
        user: user_read(store, Some(viewer), author).await?,
        recipes,
        recipes_count: store.count_author_recipes(author.id).await?,
    })
}
