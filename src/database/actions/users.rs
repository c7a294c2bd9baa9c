use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, NewUser, User, UserRole, UserRow},
};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user; `user.password` must already be hashed.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES (LOWER($1), $2, $3, $4, $5)
        RETURNING *;
    ",
    )
    .bind(user.email)
    .bind(user.username)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.password)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_users(
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
}

pub async fn update_password(
    user_id: Id,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn update_role(user_id: Id, role: UserRole, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn create_session(
    user_id: Id,
    token_id: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("INSERT INTO sessions (token_id, user_id) VALUES ($1, $2)")
        .bind(token_id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn session_exists(pool: &Pool<Postgres>, token_id: &str) -> Result<bool, Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM sessions WHERE token_id = $1)")
        .bind(token_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn delete_session(token_id: &str, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM sessions WHERE token_id = $1")
        .bind(token_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
