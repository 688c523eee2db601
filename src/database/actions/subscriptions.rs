use crate::{
    actions::{
        recipes::{count_recipes_by_author, list_recipes_by_author},
        users::require_user,
    },
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, Subscription, SubscriptionView, UserProfile},
};

use sqlx::{Pool, Sqlite};

async fn subscription_view(
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, ApiError> {
    let author = require_user(author_id, pool).await?;
    let recipes = list_recipes_by_author(author_id, recipes_limit, pool).await?;
    let recipes_count = count_recipes_by_author(author_id, pool).await?;

    Ok(SubscriptionView {
        author: UserProfile::from_user(author, true),
        recipes,
        recipes_count,
    })
}

/// Subscribes the caller to `author_id`. Self-subscription and repeated
/// subscriptions fail with a caller-correctable error.
pub async fn subscribe(
    author_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, ApiError> {
    if author_id == session.user_id {
        return Err(ApiError::validation("Cannot subscribe to yourself"));
    }
    require_user(author_id, pool).await?;

    sqlx::query("INSERT INTO subscriptions (subscriber_id, subscribed_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::from_insert(e, "Already subscribed to this user"))?;

    log::info!("User {} subscribed to {author_id}", session.user_id);

    subscription_view(author_id, None, pool).await
}

pub async fn unsubscribe(
    author_id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    require_user(author_id, pool).await?;

    let result =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND subscribed_id = $2")
            .bind(session.user_id)
            .bind(author_id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Not subscribed to this user"));
    }

    Ok(())
}

/// Authors the caller follows, each with up to `recipes_limit` of their newest recipes.
pub async fn list_subscriptions(
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    if recipes_limit.is_some_and(|limit| limit < 0) {
        return Err(ApiError::validation("recipes_limit can't be negative"));
    }

    let rows: Vec<Subscription> =
        sqlx::query_as("SELECT * FROM subscriptions WHERE subscriber_id = $1 ORDER BY id")
            .bind(session.user_id)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(subscription_view(row.subscribed_id, recipes_limit, pool).await?);
    }

    Ok(views)
}
