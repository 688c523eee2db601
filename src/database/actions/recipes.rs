use crate::{
    actions::{
        favorites::is_favorite, ingredients::get_ingredient, shopping_cart::is_in_shopping_cart,
        tags::get_tag, tags::list_recipe_tags, users::get_user_profile,
    },
    constants::{
        MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MAX_RECIPE_NAME_LENGTH, MIN_COOKING_TIME,
        MIN_INGREDIENT_AMOUNT,
    },
    error::{ApiError, QueryError},
    jwt::SessionData,
    merge::merge_amounts,
    schema::{
        Id, IngredientAmount, NewRecipe, Recipe, RecipeDetail, RecipePart, RecipeUpdate,
        ShortRecipe,
    },
};

use sqlx::{Executor, Pool, QueryBuilder, Sqlite, SqliteConnection};

/// Checks the submitted ingredient lines and merges lines sharing an ingredient id.
pub fn validate_ingredients(entries: &[IngredientAmount]) -> Result<Vec<(Id, i32)>, ApiError> {
    if entries.is_empty() {
        return Err(ApiError::validation(
            "Recipe must include at least one ingredient",
        ));
    }

    if let Some(entry) = entries
        .iter()
        .find(|entry| !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&entry.amount))
    {
        return Err(ApiError::Validation(format!(
            "Amount of ingredient {} must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}",
            entry.id
        )));
    }

    merge_amounts(
        entries
            .iter()
            .map(|entry| (entry.id, i64::from(entry.amount))),
    )
    .into_iter()
    .map(|(id, total)| {
        i32::try_from(total)
            .ok()
            .filter(|total| *total <= MAX_INGREDIENT_AMOUNT)
            .map(|total| (id, total))
            .ok_or_else(|| {
                ApiError::Validation(format!(
                    "Total amount of ingredient {id} exceeds {MAX_INGREDIENT_AMOUNT}"
                ))
            })
    })
    .collect()
}

/// Checks the submitted tag ids and drops repeated ones, keeping the first occurrence.
pub fn validate_tags(tags: &[Id]) -> Result<Vec<Id>, ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("Recipe must include at least one tag"));
    }

    let mut unique: Vec<Id> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(tag) {
            unique.push(*tag);
        }
    }

    Ok(unique)
}

pub fn validate_cooking_time(cooking_time: i32) -> Result<(), ApiError> {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
        return Err(ApiError::Validation(format!(
            "Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME} minutes"
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Recipe name can't be empty"));
    }
    if name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Recipe name can't be longer than {MAX_RECIPE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

pub async fn get_recipe<'e, E>(id: Id, executor: E) -> Result<Option<Recipe>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn require_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<Recipe, ApiError> {
    get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))
}

/// Loads a recipe the caller is allowed to modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    let recipe = require_recipe(id, pool).await?;

    if !session.is_author_of(&recipe) {
        return Err(ApiError::Forbidden(String::from(
            "Only the author can modify this recipe",
        )));
    }

    Ok(recipe)
}

pub async fn list_recipe_ingredients<'e, E>(
    recipe_id: Id,
    executor: E,
) -> Result<Vec<RecipePart>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<RecipePart> = sqlx::query_as("
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ")
    .bind(recipe_id)
    .fetch_all(executor).await.map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipes_by_author(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShortRecipe>, ApiError> {
    // A negative LIMIT means no limit in SQLite.
    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_recipes_by_author(author_id: Id, pool: &Pool<Sqlite>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn get_short_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<ShortRecipe, ApiError> {
    let row: Option<ShortRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))
}

/// Recipe with its associations, as seen by `viewer`.
pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Sqlite>,
) -> Result<Option<RecipeDetail>, ApiError> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author = get_user_profile(recipe.author_id, viewer, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe author doesn't exist"))?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            is_favorite(recipe.id, viewer.user_id, pool).await?,
            is_in_shopping_cart(recipe.id, viewer.user_id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(Some(RecipeDetail {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    }))
}

/// Every recipe, newest first, with flags relative to `viewer`.
pub async fn list_recipes(
    viewer: Option<&SessionData>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<RecipeDetail>, ApiError> {
    let ids: Vec<(Id,)> = sqlx::query_as("SELECT id FROM recipes ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let mut recipes = Vec::with_capacity(ids.len());
    for (id,) in ids {
        // Deleted between the two reads.
        if let Some(recipe) = get_recipe_detail(id, viewer, pool).await? {
            recipes.push(recipe);
        }
    }

    Ok(recipes)
}

/// Another recipe of the same author with the same name and text sharing at
/// least one ingredient.
async fn find_duplicate_recipe(
    recipe_id: Id,
    author_id: Id,
    name: &str,
    text: &str,
    ingredient_ids: &[Id],
    conn: &mut SqliteConnection,
) -> Result<bool, ApiError> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "
        SELECT COUNT(*) FROM recipes r
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = r.id
        WHERE r.id <> ",
    );
    query
        .push_bind(recipe_id)
        .push(" AND r.author_id = ")
        .push_bind(author_id)
        .push(" AND r.name = ")
        .push_bind(name)
        .push(" AND r.text = ")
        .push_bind(text)
        .push(" AND ri.ingredient_id IN (");

    let mut ids = query.separated(", ");
    for id in ingredient_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    let count: (i64,) = query
        .build_query_as::<(i64,)>()
        .fetch_one(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

async fn insert_recipe_ingredients(
    recipe_id: Id,
    parts: &[(Id, i32)],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    for (ingredient_id, _) in parts {
        if get_ingredient(*ingredient_id, &mut *conn).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Ingredient {ingredient_id} doesn't exist"
            )));
        }
    }

    if parts.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(parts, |mut row, (ingredient_id, amount)| {
        row.push_bind(recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    for tag_id in tags {
        if get_tag(*tag_id, &mut *conn).await?.is_none() {
            return Err(ApiError::NotFound(format!("Tag {tag_id} doesn't exist")));
        }
    }

    if tags.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Creates a recipe and its ingredient and tag rows in a single transaction.
///
/// Ingredient lines sharing an id are summed. Fails with `Validation` on an
/// empty ingredient or tag list, out-of-range values or a duplicate of one of
/// the author's recipes, and with `NotFound` on unknown ingredient or tag ids.
pub async fn create_recipe(
    recipe: NewRecipe,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<RecipeDetail, ApiError> {
    let parts = validate_ingredients(&recipe.ingredients)?;
    let tags = validate_tags(&recipe.tags)?;
    validate_name(&recipe.name)?;
    validate_cooking_time(recipe.cooking_time)?;

    let ingredient_ids: Vec<Id> = parts.iter().map(|(id, _)| *id).collect();

    // The insert comes first so the transaction takes the write lock before
    // any read.
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(&recipe.image)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    let recipe_id = id.0;

    if find_duplicate_recipe(
        recipe_id,
        session.user_id,
        &recipe.name,
        &recipe.text,
        &ingredient_ids,
        &mut tx,
    )
    .await?
    {
        return Err(ApiError::validation("Recipe already exists"));
    }

    insert_recipe_ingredients(recipe_id, &parts, &mut tx).await?;
    insert_recipe_tags(recipe_id, &tags, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!(
        "User {} created recipe {recipe_id} with {} ingredients",
        session.user_id,
        parts.len()
    );

    get_recipe_detail(recipe_id, Some(session), pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))
}

/// Applies a partial update. Provided ingredient or tag lists replace the
/// current rows wholesale; omitted ones are left untouched.
///
/// Ownership is not checked here, see `get_recipe_mut`.
pub async fn update_recipe(
    id: Id,
    update: RecipeUpdate,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<RecipeDetail, ApiError> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(cooking_time) = update.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    let parts = update
        .ingredients
        .as_deref()
        .map(validate_ingredients)
        .transpose()?;
    let tags = update.tags.as_deref().map(validate_tags).transpose()?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let result = sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&update.name)
    .bind(&update.text)
    .bind(update.cooking_time)
    .bind(&update.image)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    if let Some(tags) = &tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;

        insert_recipe_tags(id, tags, &mut tx).await?;
    }

    if let Some(parts) = &parts {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;

        insert_recipe_ingredients(id, parts, &mut tx).await?;
    }

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("User {} updated recipe {id}", session.user_id);

    get_recipe_detail(id, Some(session), pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))
}

/// Deletes a recipe owned by the caller. Association, favorite and cart rows cascade.
pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} deleted recipe {id}", session.user_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: Id, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let result = validate_ingredients(&[]);

        assert!(matches!(result, Err(ApiError::Validation(message)) if message.contains("at least one ingredient")));
    }

    #[test]
    fn repeated_ingredients_are_summed() {
        let parts = validate_ingredients(&[entry(1, 3), entry(2, 2), entry(1, 4)]).unwrap();

        assert_eq!(parts, vec![(1, 7), (2, 2)]);
    }

    #[test]
    fn amounts_out_of_range_are_rejected() {
        assert!(validate_ingredients(&[entry(1, 0)]).is_err());
        assert!(validate_ingredients(&[entry(1, -5)]).is_err());
        assert!(validate_ingredients(&[entry(1, MAX_INGREDIENT_AMOUNT + 1)]).is_err());
        assert!(validate_ingredients(&[entry(1, MAX_INGREDIENT_AMOUNT)]).is_ok());
    }

    #[test]
    fn merged_total_over_limit_is_rejected() {
        let result = validate_ingredients(&[entry(1, 6000), entry(1, 6000)]);

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn tags_are_required_and_deduplicated() {
        assert!(validate_tags(&[]).is_err());
        assert_eq!(validate_tags(&[3, 1, 3, 2, 1]).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn cooking_time_bounds() {
        assert!(validate_cooking_time(0).is_err());
        assert!(validate_cooking_time(1).is_ok());
        assert!(validate_cooking_time(720).is_ok());
        assert!(validate_cooking_time(721).is_err());
    }

    #[test]
    fn recipe_name_must_not_be_blank() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(MAX_RECIPE_NAME_LENGTH + 1)).is_err());
        assert!(validate_name("Borscht").is_ok());
    }
}
