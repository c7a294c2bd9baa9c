use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    error::{conflict, Error},
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft, RecipeFilter,
        RecipeIngredient, RecipeMark, ShoppingListItem, Tag, User, UserRole,
    },
    store::Store,
};
use crate::shopping_list::aggregate;

#[derive(Default)]
struct State {
    next_id: Id,
    users: BTreeMap<Id, User>,
    sessions: HashSet<String>,
    subscriptions: BTreeSet<(Id, Id)>,
    tags: BTreeMap<Id, Tag>,
    ingredients: BTreeMap<Id, Ingredient>,
    recipes: BTreeMap<Id, Recipe>,
    recipe_tags: BTreeMap<Id, Vec<Id>>,
    recipe_ingredients: BTreeMap<Id, Vec<(Id, i32)>>,
    favorites: BTreeSet<(Id, Id)>,
    shopping_cart: BTreeSet<(Id, Id)>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn marks(&mut self, mark: RecipeMark) -> &mut BTreeSet<(Id, Id)> {
        match mark {
            RecipeMark::Favorite => &mut self.favorites,
            RecipeMark::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn parts(&self, recipe_id: Id) -> Vec<RecipeIngredient> {
        self.recipe_ingredients
            .get(&recipe_id)
            .into_iter()
            .flatten()
            .filter_map(|(ingredient_id, amount)| {
                self.ingredients
                    .get(ingredient_id)
                    .map(|ingredient| RecipeIngredient {
                        id: ingredient.id,
                        name: ingredient.name.to_owned(),
                        measurement_unit: ingredient.measurement_unit.to_owned(),
                        amount: *amount,
                    })
            })
            .collect()
    }

    /// Mirrors the foreign keys: links must point at existing rows.
    fn check_links(&self, draft: &RecipeDraft) -> Result<(), Error> {
        let tags_exist = draft.tags.iter().all(|id| self.tags.contains_key(id));
        let ingredients_exist = draft
            .ingredients
            .iter()
            .all(|part| self.ingredients.contains_key(&part.id));

        if !tags_exist || !ingredients_exist {
            return Err(conflict(None));
        }
        Ok(())
    }

    fn name_taken(&self, author_id: Id, name: &str, except: Option<Id>) -> bool {
        self.recipes
            .values()
            .any(|r| r.author_id == author_id && r.name == name && Some(r.id) != except)
    }

    fn newest_first(&self, mut recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        recipes
    }
}

/// Process-local [`Store`]; data lives as long as the value.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut state = self.state();
        let email = user.email.to_lowercase();

        if state.users.values().any(|u| u.email == email) {
            return Err(conflict(Some("unique_user_email")));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(conflict(Some("unique_user_username")));
        }

        let row = User {
            id: state.next_id(),
            email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: UserRole::User,
            date_joined: Utc::now(),
        };
        state.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        let users = self.state().users.values().cloned().collect();
        Ok(page(users, limit, offset))
    }

    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error> {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.password = password.to_string();
        }
        Ok(())
    }

    async fn set_role(&self, user_id: Id, role: UserRole) -> Result<(), Error> {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.role = role;
        }
        Ok(())
    }

    async fn create_session(&self, _user_id: Id, token_id: &str) -> Result<(), Error> {
        self.state().sessions.insert(token_id.to_string());
        Ok(())
    }

    async fn session_exists(&self, token_id: &str) -> Result<bool, Error> {
        Ok(self.state().sessions.contains(token_id))
    }

    async fn delete_session(&self, token_id: &str) -> Result<(), Error> {
        self.state().sessions.remove(token_id);
        Ok(())
    }

    async fn subscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self.state().subscriptions.insert((user_id, author_id)))
    }

    async fn unsubscribe(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self.state().subscriptions.remove(&(user_id, author_id)))
    }

    async fn is_subscribed(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self.state().subscriptions.contains(&(user_id, author_id)))
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let state = self.state();
        let authors = state
            .subscriptions
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();
        Ok(page(authors, limit, offset))
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error> {
        let mut state = self.state();

        if state
            .tags
            .values()
            .any(|t| t.name == tag.name && t.slug != tag.slug)
        {
            return Err(conflict(Some("unique_tag_name")));
        }

        let existing = state.tags.values().find(|t| t.slug == tag.slug).map(|t| t.id);
        let id = match existing {
            Some(id) => id,
            None => state.next_id(),
        };
        let row = Tag {
            id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        state.tags.insert(id, row.clone());
        Ok(row)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.state().tags.values().cloned().collect())
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        Ok(self.state().tags.get(&id).cloned())
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error> {
        let mut state = self.state();

        if let Some(existing) = state.ingredients.values().find(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        }) {
            return Ok(existing.clone());
        }

        let row = Ingredient {
            id: state.next_id(),
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        state.ingredients.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut rows: Vec<Ingredient> = self
            .state()
            .ingredients
            .values()
            .filter(|i| match &prefix {
                Some(prefix) => i.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        Ok(self.state().ingredients.get(&id).cloned())
    }

    async fn create_recipe(&self, author_id: Id, draft: RecipeDraft) -> Result<Id, Error> {
        let mut state = self.state();

        state.check_links(&draft)?;
        if state.name_taken(author_id, &draft.name, None) {
            return Err(conflict(Some("unique_recipe_author_name")));
        }

        let id = state.next_id();
        state.recipes.insert(
            id,
            Recipe {
                id,
                author_id,
                name: draft.name,
                text: draft.text,
                image: draft.image.unwrap_or_default(),
                cooking_time: draft.cooking_time,
                pub_date: Utc::now(),
            },
        );
        state.recipe_tags.insert(id, draft.tags);
        state.recipe_ingredients.insert(
            id,
            draft.ingredients.iter().map(|p| (p.id, p.amount)).collect(),
        );
        Ok(id)
    }

    async fn update_recipe(&self, id: Id, draft: RecipeDraft) -> Result<(), Error> {
        let mut state = self.state();

        state.check_links(&draft)?;
        let author_id = match state.recipes.get(&id) {
            Some(recipe) => recipe.author_id,
            None => return Ok(()),
        };
        if state.name_taken(author_id, &draft.name, Some(id)) {
            return Err(conflict(Some("unique_recipe_author_name")));
        }

        if let Some(recipe) = state.recipes.get_mut(&id) {
            recipe.name = draft.name;
            recipe.text = draft.text;
            recipe.cooking_time = draft.cooking_time;
            if let Some(image) = draft.image {
                recipe.image = image;
            }
        }
        state.recipe_tags.insert(id, draft.tags);
        state.recipe_ingredients.insert(
            id,
            draft.ingredients.iter().map(|p| (p.id, p.amount)).collect(),
        );
        Ok(())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        let mut state = self.state();

        let removed = state.recipes.remove(&id).is_some();
        state.recipe_tags.remove(&id);
        state.recipe_ingredients.remove(&id);
        state.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        state.shopping_cart.retain(|(_, recipe_id)| *recipe_id != id);
        Ok(removed)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        Ok(self.state().recipes.get(&id).cloned())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let state = self.state();

        let has_tag = |recipe_id: Id| {
            state
                .recipe_tags
                .get(&recipe_id)
                .into_iter()
                .flatten()
                .filter_map(|tag_id| state.tags.get(tag_id))
                .any(|tag| filter.tags.contains(&tag.slug))
        };

        let recipes = state
            .recipes
            .values()
            .filter(|r| filter.author.map_or(true, |author| r.author_id == author))
            .filter(|r| filter.tags.is_empty() || has_tag(r.id))
            .filter(|r| {
                filter
                    .favorited_by
                    .map_or(true, |user_id| state.favorites.contains(&(user_id, r.id)))
            })
            .filter(|r| {
                filter
                    .in_cart_of
                    .map_or(true, |user_id| state.shopping_cart.contains(&(user_id, r.id)))
            })
            .cloned()
            .collect();

        Ok(page(state.newest_first(recipes), limit, offset))
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        let state = self.state();
        let mut tags: Vec<Tag> = state
            .recipe_tags
            .get(&recipe_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.tags.get(id).cloned())
            .collect();
        tags.sort_by_key(|tag| tag.id);
        Ok(tags)
    }

    async fn recipe_ingredients(&self, recipe_id: Id) -> Result<Vec<RecipeIngredient>, Error> {
        Ok(self.state().parts(recipe_id))
    }

    async fn author_recipes(&self, author_id: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error> {
        let state = self.state();
        let recipes = state
            .recipes
            .values()
            .filter(|r| r.author_id == author_id)
            .cloned()
            .collect();

        let recipes = state.newest_first(recipes);
        Ok(match limit {
            Some(limit) => recipes.into_iter().take(limit.max(0) as usize).collect(),
            None => recipes,
        })
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        Ok(self
            .state()
            .recipes
            .values()
            .filter(|r| r.author_id == author_id)
            .count() as i64)
    }

    async fn add_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        Ok(self.state().marks(mark).insert((user_id, recipe_id)))
    }

    async fn remove_mark(
        &self,
        mark: RecipeMark,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        Ok(self.state().marks(mark).remove(&(user_id, recipe_id)))
    }

    async fn has_mark(&self, mark: RecipeMark, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        Ok(self.state().marks(mark).contains(&(user_id, recipe_id)))
    }

    async fn shopping_list(&self, user_id: Id) -> Result<Vec<ShoppingListItem>, Error> {
        let state = self.state();
        let parts: Vec<RecipeIngredient> = state
            .shopping_cart
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .flat_map(|(_, recipe_id)| state.parts(*recipe_id))
            .collect();

        Ok(aggregate(parts.iter()))
    }
}
