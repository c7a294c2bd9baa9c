use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Ingredient, NewIngredient},
};

pub async fn create_ingredient(
    ingredient: &NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    let row: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2)
        ON CONFLICT (name, measurement_unit) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
    ",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_ingredients(
    pool: &Pool<Postgres>,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = name_prefix.map(like_prefix);

    let rows: Vec<Ingredient> = sqlx::query_as(
        r#"SELECT * FROM ingredients
        WHERE $1::TEXT IS NULL OR name ILIKE $1
        ORDER BY name COLLATE "C", id"#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// `ILIKE` pattern matching values that start with `prefix`.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
