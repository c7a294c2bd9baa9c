use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, RecipeMark, ShoppingListItem},
};

pub async fn add_mark(
    mark: RecipeMark,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let query = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(query.rows_affected() > 0)
}

pub async fn remove_mark(
    mark: RecipeMark,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(query.rows_affected() > 0)
}

pub async fn has_mark(
    pool: &Pool<Postgres>,
    mark: RecipeMark,
    user_id: Id,
    recipe_id: Id,
) -> Result<bool, Error> {
    let row: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// Grouped ingredient totals for every recipe in the user's cart, in one round trip.
pub async fn shopping_list(
    pool: &Pool<Postgres>,
    user_id: Id,
) -> Result<Vec<ShoppingListItem>, Error> {
    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        r#"
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount)::BIGINT AS total_amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name COLLATE "C", i.measurement_unit COLLATE "C"
    "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
