use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::error::ApiError;
use crate::schema::{Id, Recipe, User};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            iat,
            exp,
        }
    }
}

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
}

impl SessionData {
    pub fn new(user_id: Id, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
        }
    }

    pub fn is_author_of(&self, recipe: &Recipe) -> bool {
        recipe.author_id == self.user_id
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            user_id: self.user_id,
            username: self.username,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Unauthorized(String::from("Invalid session key")))
}

pub fn sign_session(user: &User, secret: &str) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned());

    claims
        .sign_with_key(&key)
        .map_err(|_| ApiError::Unauthorized(String::from("Failed to sign session")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::Unauthorized(String::from("Invalid session; Invalid token")))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ApiError::Unauthorized(String::from(
            "Invalid session; Token expired",
        )));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: String::from("chef"),
            email: String::from("chef@example.com"),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn signed_session_verifies_with_same_secret() {
        let token = sign_session(&user(), "secret").unwrap();
        let session: SessionData = verify_jwt_session(&token, "secret").unwrap().into();

        assert_eq!(session, SessionData::new(7, "chef"));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = sign_session(&user(), "secret").unwrap();

        let result = verify_jwt_session(&token, "another");

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let key: Hmac<Sha256> = Hmac::new_from_slice(b"secret").unwrap();
        let mut claims = JwtSessionData::new(7, String::from("chef"));
        claims.exp = Local::now().timestamp() - 60;
        let token = claims.sign_with_key(&key).unwrap();

        let result = verify_jwt_session(&token, "secret");

        assert!(matches!(result, Err(ApiError::Unauthorized(message)) if message.contains("expired")));
    }
}
