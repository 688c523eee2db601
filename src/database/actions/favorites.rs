use crate::{
    actions::recipes::get_short_recipe,
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, ShortRecipe},
};

use sqlx::{Executor, Pool, Sqlite};

pub async fn is_favorite<'e, E>(recipe_id: Id, user_id: Id, executor: E) -> Result<bool, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE recipe_id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .fetch_one(executor)
            .await
            .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

pub async fn list_favorites(
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShortRecipe>, ApiError> {
    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT r.id AS id, r.name AS name, r.image AS image, r.cooking_time AS cooking_time
        FROM favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY f.id
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Adds a recipe to the caller's favorites. The unique `(user_id, recipe_id)`
/// constraint decides duplicates, so concurrent requests can't both succeed.
pub async fn add_to_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<ShortRecipe, ApiError> {
    let recipe = get_short_recipe(recipe_id, pool).await?;

    sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::from_insert(e, "Recipe is already in favorites"))?;

    Ok(recipe)
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    get_short_recipe(recipe_id, pool).await?;

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe is not in favorites"));
    }

    Ok(())
}
