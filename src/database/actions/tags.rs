use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, NewTag, Tag},
};

/// Inserts a tag, or refreshes the name and color of the tag with the same slug.
pub async fn create_tag(tag: &NewTag, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let row: Tag = sqlx::query_as(
        "
        INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, color = EXCLUDED.color
        RETURNING *
    ",
    )
    .bind(&tag.name)
    .bind(tag.color)
    .bind(&tag.slug)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: Id) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
