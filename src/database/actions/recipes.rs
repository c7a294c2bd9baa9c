use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Recipe, RecipeDraft, RecipeFilter, RecipeIngredient, RecipeRow},
};

pub async fn create_recipe(
    author_id: Id,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.image.as_deref().unwrap_or_default())
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_links(id.0, &draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(id.0)
}

/// Rewrites a recipe and replaces its tag and ingredient links.
pub async fn update_recipe(id: Id, draft: RecipeDraft, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(draft.image.as_deref())
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_links(id, &draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    Ok(())
}

async fn insert_recipe_links(
    recipe_id: Id,
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    if !draft.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(draft.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !draft.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query_builder.push_values(draft.ingredients.iter(), |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.id)
                .push_bind(part.amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Deletes a recipe together with its links, favorites and cart entries.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let query = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(query.rows_affected() > 0)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND r.id IN (
                SELECT rt.recipe_id FROM recipe_tags rt
                INNER JOIN tags t ON t.id = rt.tag_id
                WHERE t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND r.id IN (SELECT recipe_id FROM favorites WHERE user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND r.id IN (SELECT recipe_id FROM shopping_cart WHERE user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
}

pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_id: Id,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_author_recipes(
    pool: &Pool<Postgres>,
    author_id: Id,
    limit: Option<i64>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(pool: &Pool<Postgres>, author_id: Id) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.0)
}
