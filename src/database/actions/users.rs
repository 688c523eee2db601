use crate::{
    error::{ApiError, QueryError},
    jwt::SessionData,
    schema::{Id, User, UserProfile},
};

use sqlx::{Executor, Pool, Sqlite};

pub async fn get_user_by_id<'e, E>(user_id: Id, executor: E) -> Result<Option<User>, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user(username: &str, pool: &Pool<Sqlite>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn require_user(user_id: Id, pool: &Pool<Sqlite>) -> Result<User, ApiError> {
    get_user_by_id(user_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))
}

/// Creates a user and returns its id. Taken usernames and emails are rejected.
pub async fn register_user(
    username: &str,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Id, ApiError> {
    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ",
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiError::from_insert(e, "Username or email is already taken"))?;

    log::info!("Registered user {} ({username})", id.0);

    Ok(id.0)
}

pub async fn is_subscribed<'e, E>(
    subscriber_id: Id,
    subscribed_id: Id,
    executor: E,
) -> Result<bool, ApiError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1 AND subscribed_id = $2",
    )
    .bind(subscriber_id)
    .bind(subscribed_id)
    .fetch_one(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

/// Public view of a user; `is_subscribed` is relative to the viewer and false for anonymous ones.
pub async fn get_user_profile(
    user_id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Sqlite>,
) -> Result<Option<UserProfile>, ApiError> {
    let user = match get_user_by_id(user_id, pool).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let subscribed = match viewer {
        Some(viewer) => is_subscribed(viewer.user_id, user.id, pool).await?,
        None => false,
    };

    Ok(Some(UserProfile::from_user(user, subscribed)))
}
