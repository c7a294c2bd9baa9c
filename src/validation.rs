//! Checks on incoming payloads, run before anything is persisted.

use std::collections::HashSet;

use serde_json::Value;

use crate::constants::{
    MAX_EMAIL_LENGTH, MAX_RECIPE_NAME_LENGTH, MAX_USER_FIELD_LENGTH, RESERVED_USERNAMES,
};
use crate::database::form::{number, Form};
use crate::error::{Error, HtmlError};
use crate::schema::{Id, IngredientAmount};
use crate::store::Store;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Collects field errors so one response reports every invalid field.
#[derive(Debug, Default)]
struct Errors {
    error: Option<Error>,
}

impl Errors {
    fn add(&mut self, field: &str, message: &str) {
        self.error = Some(match self.error.take() {
            Some(error) => error.with_field(field, message),
            None => Error::field(field, message),
        });
    }

    fn finish(self) -> Result<(), Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Non-blank string field; `None` when absent or invalid, with the error recorded.
fn text_field(form: &Form, key: &str, max_length: Option<usize>, errors: &mut Errors) -> Option<String> {
    if !form.contains(key) {
        errors.add(key, REQUIRED);
        return None;
    }

    let Ok(value) = form.get_str(key) else {
        errors.add(key, "Not a valid string.");
        return None;
    };
    if value.trim().is_empty() {
        errors.add(key, BLANK);
        return None;
    }
    if let Some(max) = max_length {
        if value.chars().count() > max {
            errors.add(key, &format!("Ensure this field has no more than {max} characters."));
            return None;
        }
    }
    Some(value)
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Letters, digits and `_ . @ + -`.
fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

pub fn validate_registration(form: &Form) -> Result<Registration, Error> {
    let mut errors = Errors::default();

    let email = text_field(form, "email", Some(MAX_EMAIL_LENGTH), &mut errors);
    if let Some(email) = &email {
        if !valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
    }

    let username = text_field(form, "username", Some(MAX_USER_FIELD_LENGTH), &mut errors);
    if let Some(username) = &username {
        if !valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
            errors.add("username", &format!("The username \"{username}\" is reserved."));
        }
    }

    let first_name = text_field(form, "first_name", Some(MAX_USER_FIELD_LENGTH), &mut errors);
    let last_name = text_field(form, "last_name", Some(MAX_USER_FIELD_LENGTH), &mut errors);
    let password = text_field(form, "password", None, &mut errors);

    errors.finish()?;
    match (email, username, first_name, last_name, password) {
        (Some(email), Some(username), Some(first_name), Some(last_name), Some(password)) => {
            Ok(Registration {
                email: email.trim().to_lowercase(),
                username,
                first_name,
                last_name,
                password,
            })
        }
        _ => Err(HtmlError::InvalidRequest.default()),
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_login(form: &Form) -> Result<Credentials, Error> {
    let mut errors = Errors::default();
    let email = text_field(form, "email", None, &mut errors);
    let password = text_field(form, "password", None, &mut errors);

    errors.finish()?;
    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err(HtmlError::InvalidRequest.default()),
    }
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub new_password: String,
    pub current_password: String,
}

pub fn validate_password_change(form: &Form) -> Result<PasswordChange, Error> {
    let mut errors = Errors::default();
    let new_password = text_field(form, "new_password", None, &mut errors);
    let current_password = text_field(form, "current_password", None, &mut errors);

    errors.finish()?;
    match (new_password, current_password) {
        (Some(new_password), Some(current_password)) => Ok(PasswordChange {
            new_password,
            current_password,
        }),
        _ => Err(HtmlError::InvalidRequest.default()),
    }
}

/// Recipe payload after shape checks. Fields left out of a partial update are `None`.
#[derive(Debug, Clone, Default)]
pub struct RecipeInput {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// Base64 data URL, not yet stored.
    pub image: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

fn parse_tags(values: &[Value], errors: &mut Errors) -> Option<Vec<Id>> {
    if values.is_empty() {
        errors.add("tags", "At least one tag is required.");
        return None;
    }

    let mut tags = Vec::with_capacity(values.len());
    let mut seen = HashSet::new();
    for value in values {
        let Ok(id) = number::<Id>(value) else {
            errors.add("tags", "Tags must be given by id.");
            return None;
        };
        if !seen.insert(id) {
            errors.add("tags", "Tags must not repeat.");
            return None;
        }
        tags.push(id);
    }
    Some(tags)
}

fn parse_ingredients(values: &[Value], errors: &mut Errors) -> Option<Vec<IngredientAmount>> {
    if values.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
        return None;
    }

    let mut ingredients = Vec::with_capacity(values.len());
    let mut seen = HashSet::new();
    for value in values {
        let (Some(id), Some(amount)) = (value.get("id"), value.get("amount")) else {
            errors.add("ingredients", "Each ingredient needs an id and an amount.");
            return None;
        };
        let Ok(id) = number::<Id>(id) else {
            errors.add("ingredients", "Ingredients must be given by id.");
            return None;
        };
        let amount = match number::<i32>(amount) {
            Ok(amount) if amount >= 1 => amount,
            _ => {
                errors.add("ingredients", "Amount must be at least 1.");
                return None;
            }
        };
        if !seen.insert(id) {
            errors.add("ingredients", "Ingredients must not repeat.");
            return None;
        }
        ingredients.push(IngredientAmount { id, amount });
    }
    Some(ingredients)
}

/// Shape checks for a recipe write. With `partial`, absent fields are allowed.
pub fn parse_recipe(form: &Form, partial: bool) -> Result<RecipeInput, Error> {
    let mut errors = Errors::default();
    let mut input = RecipeInput::default();

    if form.contains("ingredients") || !partial {
        input.ingredients = match form.get_list("ingredients") {
            Ok(values) => parse_ingredients(&values, &mut errors),
            Err(_) if !form.contains("ingredients") => {
                errors.add("ingredients", REQUIRED);
                None
            }
            Err(_) => {
                errors.add("ingredients", "Expected a list of items.");
                None
            }
        };
    }

    if form.contains("tags") || !partial {
        input.tags = match form.get_list("tags") {
            Ok(values) => parse_tags(&values, &mut errors),
            Err(_) if !form.contains("tags") => {
                errors.add("tags", REQUIRED);
                None
            }
            Err(_) => {
                errors.add("tags", "Expected a list of items.");
                None
            }
        };
    }

    if form.contains("image") {
        match form.get_str("image") {
            Ok(image) if !image.trim().is_empty() => input.image = Some(image),
            _ => errors.add("image", "Upload a valid base64 encoded image."),
        }
    } else if !partial {
        errors.add("image", REQUIRED);
    }

    if form.contains("name") || !partial {
        input.name = text_field(form, "name", Some(MAX_RECIPE_NAME_LENGTH), &mut errors);
    }
    if form.contains("text") || !partial {
        input.text = text_field(form, "text", None, &mut errors);
    }

    if form.contains("cooking_time") {
        match form.get_number::<i32>("cooking_time") {
            Ok(minutes) if minutes >= 1 => input.cooking_time = Some(minutes),
            Ok(_) => errors.add("cooking_time", "Cooking time must be at least 1 minute."),
            Err(_) => errors.add("cooking_time", "A valid integer is required."),
        }
    } else if !partial {
        errors.add("cooking_time", REQUIRED);
    }

    errors.finish()?;
    Ok(input)
}

/// Every referenced tag and ingredient has to exist.
pub async fn check_references(store: &dyn Store, input: &RecipeInput) -> Result<(), Error> {
    let mut errors = Errors::default();

    for id in input.tags.iter().flatten() {
        if store.get_tag(*id).await?.is_none() {
            errors.add("tags", &format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    for ingredient in input.ingredients.iter().flatten() {
        if store.get_ingredient(ingredient.id).await?.is_none() {
            errors.add(
                "ingredients",
                &format!("Invalid pk \"{}\" - object does not exist.", ingredient.id),
            );
        }
    }

    errors.finish()
}
