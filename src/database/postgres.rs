use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{
    actions,
    error::{Error, QueryError},
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft, RecipeFilter,
        RecipeIngredient, RecipeMark, ShoppingListItem, Tag, User, UserRole,
    },
    store::Store,
};

/// [`Store`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        actions::register_user(user, &self.pool).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        actions::get_user_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        actions::get_user(&self.pool, email).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        actions::list_users(limit, offset, &self.pool).await
    }

    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error> {
        actions::update_password(user_id, password, &self.pool).await
    }

    async fn set_role(&self, user_id: Id, role: UserRole) -> Result<(), Error> {
        actions::update_role(user_id, role, &self.pool).await
    }

    async fn create_session(&self, user_id: Id, token_id: &str) -> Result<(), Error> {
        actions::create_session(user_id, token_id, &self.pool).await
    }

    async fn session_exists(&self, token_id: &str) -> Result<bool, Error> {
        actions::session_exists(&self.pool, token_id).await
    }

    async fn delete_session(&self, token_id: &str) -> Result<(), Error> {
        actions::delete_session(token_id, &self.pool).await
    }

    async fn subscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::subscribe(user_id, author_id, &self.pool).await
    }

    async fn unsubscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::unsubscribe(user_id, author_id, &self.pool).await
    }

    async fn is_subscribed(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::is_subscribed(&self.pool, user_id, author_id).await
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        actions::list_subscriptions(user_id, limit, offset, &self.pool).await
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error> {
        actions::create_tag(&tag, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        actions::list_tags(&self.pool).await
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        actions::get_tag(id, &self.pool).await
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error> {
        actions::create_ingredient(&ingredient, &self.pool).await
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        actions::list_ingredients(&self.pool, name_prefix).await
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        actions::get_ingredient(id, &self.pool).await
    }

    async fn create_recipe(&self, author_id: Id, draft: RecipeDraft) -> Result<Id, Error> {
        actions::create_recipe(author_id, draft, &self.pool).await
    }

    async fn update_recipe(&self, id: Id, draft: RecipeDraft) -> Result<(), Error> {
        actions::update_recipe(id, draft, &self.pool).await
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        actions::delete_recipe(id, &self.pool).await
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        actions::get_recipe(id, &self.pool).await
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        actions::fetch_recipes(filter, limit, offset, &self.pool).await
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        actions::list_recipe_tags(&self.pool, recipe_id).await
    }

    async fn recipe_ingredients(&self, recipe_id: Id) -> Result<Vec<RecipeIngredient>, Error> {
        actions::list_recipe_ingredients(&self.pool, recipe_id).await
    }

    async fn author_recipes(&self, author_id: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error> {
        actions::list_author_recipes(&self.pool, author_id, limit).await
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        actions::count_author_recipes(&self.pool, author_id).await
    }

    async fn add_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        actions::add_mark(mark, user_id, recipe_id, &self.pool).await
    }

    async fn remove_mark(
        &self,
        mark: RecipeMark,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        actions::remove_mark(mark, user_id, recipe_id, &self.pool).await
    }

    async fn has_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        actions::has_mark(&self.pool, mark, user_id, recipe_id).await
    }

    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListItem>, Error> {
        actions::shopping_list(&self.pool, user_id).await
    }
}
