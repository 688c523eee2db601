use crate::{
    actions::recipes::{get_short_recipe, list_recipe_ingredients},
    error::{ApiError, QueryError},
    jwt::SessionData,
    merge::merge_amounts,
    schema::{Id, RecipePart, ShortRecipe},
};

use sqlx::{Executor, Pool, Sqlite};

pub async fn is_in_shopping_cart<'e, E>(
    recipe_id: Id,
    user_id: Id,
    executor: E,
) -> Result<bool, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE recipe_id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .fetch_one(executor)
            .await
            .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

/// Recipes in the user's cart, in the order they were added.
pub async fn list_shopping_cart(
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShortRecipe>, ApiError> {
    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT r.id AS id, r.name AS name, r.image AS image, r.cooking_time AS cooking_time
        FROM shopping_cart c
        INNER JOIN recipes r ON r.id = c.recipe_id
        WHERE c.user_id = $1
        ORDER BY c.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<ShortRecipe, ApiError> {
    let recipe = get_short_recipe(recipe_id, pool).await?;

    sqlx::query("INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::from_insert(e, "Recipe is already in the shopping cart"))?;

    Ok(recipe)
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    get_short_recipe(recipe_id, pool).await?;

    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe is not in the shopping cart"));
    }

    Ok(())
}

/// Merges ingredient rows by `(name, unit)` and renders one `name(unit)-total`
/// line per ingredient, in the order ingredients are first seen.
///
/// Keying by name and unit rather than id folds catalog entries that describe
/// the same ingredient into one line.
pub fn render_shopping_list<I>(parts: I) -> String
where
    I: IntoIterator<Item = RecipePart>,
{
    merge_amounts(
        parts
            .into_iter()
            .map(|part| ((part.name, part.measurement_unit), i64::from(part.amount))),
    )
    .into_iter()
    .map(|((name, unit), total)| format!("{name}({unit})-{total}\n"))
    .collect()
}

/// Builds the text shopping list for every recipe in the user's cart. An empty cart gives an empty string.
pub async fn build_shopping_list(user_id: Id, pool: &Pool<Sqlite>) -> Result<String, ApiError> {
    let recipes = list_shopping_cart(user_id, pool).await?;

    let mut parts: Vec<RecipePart> = vec![];
    for recipe in &recipes {
        parts.extend(list_recipe_ingredients(recipe.id, pool).await?);
    }

    log::debug!(
        "Shopping list for user {user_id}: {} recipes, {} ingredient rows",
        recipes.len(),
        parts.len()
    );

    Ok(render_shopping_list(parts))
}
