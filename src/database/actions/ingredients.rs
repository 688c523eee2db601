use crate::{
    error::{ApiError, QueryError},
    schema::{Id, Ingredient},
};

use sqlx::{Executor, Pool, Sqlite};

pub async fn list_ingredients(pool: &Pool<Sqlite>) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Ingredients whose name starts with `prefix`, ignoring case.
///
/// SQLite only folds ASCII case, so matching happens on lowercased names here.
pub async fn search_ingredients(
    prefix: &str,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, ApiError> {
    let prefix = prefix.to_lowercase();

    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows
        .into_iter()
        .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
        .collect())
}

pub async fn get_ingredient<'e, E>(id: Id, executor: E) -> Result<Option<Ingredient>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Sqlite>,
) -> Result<Id, ApiError> {
    let id: (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(id.0)
}
