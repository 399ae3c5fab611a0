//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event parse error: {0}")]
    EventParse(String),

    #[error("Shutdown in progress")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, IndexerError>;
