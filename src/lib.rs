mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod merge;
    pub mod schema;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
}
mod config;
mod constants;

pub mod routes;

pub use authentication::*;
pub use config::*;
pub use connection::*;
pub use constants::*;
pub use database::*;
pub use merge::*;
