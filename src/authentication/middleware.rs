use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::ApiError};

use super::jwt::{verify_jwt_session, SessionData};

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |session: Option<String>| {
        let secret = secret.clone();
        async move {
            session
                .ok_or_else(|| {
                    ApiError::Unauthorized(String::from(
                        "Authentication credentials were not provided",
                    ))
                })
                .and_then(|session| verify_jwt_session(&session, &secret))
                .map(|data| -> SessionData { data.into() })
                .map_err(|e| -> Rejection { e.into() })
        }
    })
}

/// Resolves the caller when a valid session cookie is present, anonymous otherwise.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session
            .and_then(|session| verify_jwt_session(&session, &secret).ok())
            .map(|data| -> SessionData { data.into() })
    })
}
