//! Thin warp glue over the actions. Handlers resolve the caller, hand the
//! parsed payload to the core and translate `ApiError` into rejections.

use std::{convert::Infallible, sync::Arc};

use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, Rejection},
    Filter, Reply,
};

use crate::{
    actions::{favorites, ingredients, recipes, shopping_cart, subscriptions, tags, users},
    constants::SHOPPING_LIST_FILENAME,
    error::{ApiError, ErrorMessage},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::{Id, NewRecipe, RecipeUpdate},
};

const MAX_BODY_BYTES: u64 = 1024 * 1024 * 16;

#[derive(Deserialize, Debug, Default)]
struct IngredientQuery {
    name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct SubscriptionQuery {
    recipes_limit: Option<i64>,
}

fn into_rejection(error: ApiError) -> Rejection {
    error.into()
}

fn with_pool(
    pool: Pool<Sqlite>,
) -> impl Filter<Extract = (Pool<Sqlite>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Every `/api` route. Pair with [`handle_rejection`] through `recover`.
pub fn api(
    pool: Pool<Sqlite>,
    secret: Arc<str>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    catalog(pool.clone())
        .or(recipe_routes(pool.clone(), secret.clone()))
        .or(cart_routes(pool.clone(), secret.clone()))
        .or(user_routes(pool, secret))
}

fn catalog(pool: Pool<Sqlite>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(list_tags_handler);

    let list_ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_pool(pool))
        .and_then(list_ingredients_handler);

    list_tags.or(list_ingredients)
}

fn recipe_routes(
    pool: Pool<Sqlite>,
    secret: Arc<str>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<NewRecipe>())
        .and(with_pool(pool.clone()))
        .and_then(create_recipe_handler);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(list_recipes_handler);

    let get = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(get_recipe_handler);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeUpdate>())
        .and(with_pool(pool.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_pool(pool))
        .and_then(delete_recipe_handler);

    create.or(list).or(get).or(update).or(delete)
}

fn cart_routes(
    pool: Pool<Sqlite>,
    secret: Arc<str>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let add_favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(add_favorite_handler);

    let remove_favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(remove_favorite_handler);

    let add_to_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(add_to_cart_handler);

    let remove_from_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(remove_from_cart_handler);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret))
        .and(with_pool(pool))
        .and_then(download_shopping_cart_handler);

    add_favorite
        .or(remove_favorite)
        .or(add_to_cart)
        .or(remove_from_cart)
        .or(download)
}

fn user_routes(
    pool: Pool<Sqlite>,
    secret: Arc<str>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_pool(pool.clone()))
        .and_then(list_subscriptions_handler);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(unsubscribe_handler);

    let profile = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(secret))
        .and(with_pool(pool))
        .and_then(user_profile_handler);

    list.or(subscribe).or(unsubscribe).or(profile)
}

async fn list_tags_handler(pool: Pool<Sqlite>) -> Result<impl Reply, Rejection> {
    let tags = tags::list_tags(&pool).await.map_err(into_rejection)?;
    Ok(warp::reply::json(&tags))
}

async fn list_ingredients_handler(
    query: IngredientQuery,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let rows = match query.name {
        Some(name) => ingredients::search_ingredients(&name, &pool).await,
        None => ingredients::list_ingredients(&pool).await,
    }
    .map_err(into_rejection)?;

    Ok(warp::reply::json(&rows))
}

async fn create_recipe_handler(
    session: SessionData,
    payload: NewRecipe,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::create_recipe(payload, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

async fn list_recipes_handler(
    session: Option<SessionData>,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let recipes = recipes::list_recipes(session.as_ref(), &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::json(&recipes))
}

async fn get_recipe_handler(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_detail(id, session.as_ref(), &pool)
        .await
        .map_err(into_rejection)?
        .ok_or_else(|| into_rejection(ApiError::not_found("No recipe exists with specified id")))?;

    Ok(warp::reply::json(&recipe))
}

async fn update_recipe_handler(
    id: Id,
    session: SessionData,
    payload: RecipeUpdate,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    recipes::get_recipe_mut(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    let recipe = recipes::update_recipe(id, payload, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::json(&recipe))
}

async fn delete_recipe_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    recipes::delete_recipe(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_favorite_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let recipe = favorites::add_to_favorites(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

async fn remove_favorite_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    favorites::remove_from_favorites(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let recipe = shopping_cart::add_to_shopping_cart(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

async fn remove_from_cart_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    shopping_cart::remove_from_shopping_cart(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart_handler(
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let list = shopping_cart::build_shopping_list(session.user_id, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::with_header(
        list,
        "Content-Disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    ))
}

async fn list_subscriptions_handler(
    session: SessionData,
    query: SubscriptionQuery,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let views = subscriptions::list_subscriptions(&session, query.recipes_limit, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::json(&views))
}

async fn subscribe_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let view = subscriptions::subscribe(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&view),
        StatusCode::CREATED,
    ))
}

async fn unsubscribe_handler(
    id: Id,
    session: SessionData,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    subscriptions::unsubscribe(id, &session, &pool)
        .await
        .map_err(into_rejection)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn user_profile_handler(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Sqlite>,
) -> Result<impl Reply, Rejection> {
    let profile = users::get_user_profile(id, session.as_ref(), &pool)
        .await
        .map_err(into_rejection)?
        .ok_or_else(|| into_rejection(ApiError::not_found("No user exists with specified id")))?;

    Ok(warp::reply::json(&profile))
}

/// Renders rejections as `{ "code", "message" }` JSON.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let message = if let Some(error) = err.find::<ApiError>() {
        if let ApiError::Query(e) = error {
            log::error!("Request failed: {e}");
        }
        ErrorMessage::from(error)
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        ErrorMessage {
            code: StatusCode::BAD_REQUEST.as_u16(),
            message: e.to_string(),
        }
    } else if err.find::<InvalidQuery>().is_some() {
        ErrorMessage {
            code: StatusCode::BAD_REQUEST.as_u16(),
            message: String::from("Invalid query string"),
        }
    } else if err.find::<MethodNotAllowed>().is_some() {
        ErrorMessage {
            code: StatusCode::METHOD_NOT_ALLOWED.as_u16(),
            message: String::from("Method not allowed"),
        }
    } else if err.is_not_found() {
        ErrorMessage {
            code: StatusCode::NOT_FOUND.as_u16(),
            message: String::from("Not found"),
        }
    } else {
        log::error!("Unhandled rejection: {err:?}");
        ErrorMessage {
            code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: String::from("Internal server error"),
        }
    };

    let code = StatusCode::from_u16(message.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    Ok(warp::reply::with_status(warp::reply::json(&message), code))
}
