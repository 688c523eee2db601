use std::{str::FromStr, time::Duration};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{config::Config, constants::DATABASE_BUSY_TIMEOUT_SECS, error::QueryError};

pub static MIGRATOR: Migrator = sqlx::migrate!();

pub async fn connect(config: &Config) -> Result<Pool<Sqlite>, QueryError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(DATABASE_BUSY_TIMEOUT_SECS));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    log::info!("Connected to {}", config.database_url);

    Ok(pool)
}

/// Opens a private in-memory database with the schema applied.
///
/// The pool holds a single connection that is never recycled, since every
/// in-memory connection would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>, QueryError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), QueryError> {
    MIGRATOR.run(pool).await?;

    Ok(())
}
