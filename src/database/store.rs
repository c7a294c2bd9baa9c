use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft, RecipeFilter,
        RecipeIngredient, RecipeMark, ShoppingListItem, Tag, User, UserRole,
    },
};

/// Persistence behind the api.
///
/// Paired writes (`subscribe`, `add_mark`) return `false` instead of
/// duplicating an existing pair, and their removals return `false` when the
/// pair is absent. Recipe writes either persist the whole draft or nothing.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    /// Users ordered by id, with the total count.
    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error>;
    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error>;
    async fn set_role(&self, user_id: Id, role: UserRole) -> Result<(), Error>;

    async fn create_session(&self, user_id: Id, token_id: &str) -> Result<(), Error>;
    async fn session_exists(&self, token_id: &str) -> Result<bool, Error>;
    async fn delete_session(&self, token_id: &str) -> Result<(), Error>;

    async fn subscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn unsubscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn is_subscribed(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    /// Authors followed by `user_id`, ordered by id, with the total count.
    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error>;

    /// Inserts a tag unless one with the same slug exists; returns the stored tag.
    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error>;

    /// Inserts an ingredient unless the (name, unit) pair exists; returns the stored one.
    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error>;
    /// Ingredients ordered by name, optionally restricted to a case-insensitive prefix.
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error>;

    async fn create_recipe(&self, author_id: Id, draft: RecipeDraft) -> Result<Id, Error>;
    async fn update_recipe(&self, id: Id, draft: RecipeDraft) -> Result<(), Error>;
    async fn delete_recipe(&self, id: Id) -> Result<bool, Error>;
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error>;
    /// Recipes newest first, with the total count of matching recipes.
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error>;
    async fn recipe_ingredients(&self, recipe_id: Id) -> Result<Vec<RecipeIngredient>, Error>;
    async fn author_recipes(&self, author_id: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error>;
    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error>;

    async fn add_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error>;
    async fn remove_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id)
        -> Result<bool, Error>;
    async fn has_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error>;

    /// Ingredient totals over every recipe in the user's shopping cart,
    /// ordered by name then unit.
    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListItem>, Error>;
}
