use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, User, UserRow},
};

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let query = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(query.rows_affected() > 0)
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let query = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(query.rows_affected() > 0)
}

pub async fn is_subscribed(pool: &Pool<Postgres>, user_id: Id, author_id: Id) -> Result<bool, Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn list_subscriptions(
    user_id: Id,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
}
