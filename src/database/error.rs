use std::fmt::{self, Display};

use serde::Serialize;
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

/// Errors surfaced to the HTTP layer. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    /// A unique constraint rejected an insert. Reported like `Validation`.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Query failed: {0}")]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    /// Maps an insert failure, turning a unique constraint violation into `Conflict`.
    pub fn from_insert(error: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(e) = &error {
            if e.is_unique_violation() {
                return Self::Conflict(conflict.to_string());
            }
        }
        QueryError::from(error).into()
    }

    /// True for caller-correctable errors, including lost check-then-insert races.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict(_))
    }

    pub fn code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for ApiError {}

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
}

impl From<&ApiError> for ErrorMessage {
    fn from(value: &ApiError) -> Self {
        let message = match value {
            ApiError::Query(_) => String::from("Internal server error"),
            other => other.to_string(),
        };

        Self {
            code: value.code().as_u16(),
            message,
        }
    }
}
