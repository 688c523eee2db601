use crate::{
    error::{ApiError, QueryError},
    schema::{Id, Tag},
};

use sqlx::{Executor, Pool, Sqlite};

pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Sqlite>,
) -> Result<Id, ApiError> {
    let id: (Id,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id")
            .bind(name)
            .bind(color)
            .bind(slug)
            .fetch_one(pool)
            .await
            .map_err(|e| ApiError::from_insert(e, "Tag with this slug already exists"))?;

    Ok(id.0)
}

pub async fn get_tag<'e, E>(id: Id, executor: E) -> Result<Option<Tag>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Sqlite>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags<'e, E>(recipe_id: Id, executor: E) -> Result<Vec<Tag>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY rt.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
