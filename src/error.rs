//! Error types for the catalog cache and session controllers

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Transport failure talking to the provider
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected data is absent (no profile, unknown channel, ...)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credential check rejected by the provider
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Player error: {0}")]
    Player(String),

    /// Background task was cancelled or panicked
    #[error("Task failed: {0}")]
    Task(String),
}

impl CatalogError {
    /// Transient errors leave the cache unrefreshed but are not fatal
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::Http(_) | CatalogError::Status(_) | CatalogError::Json(_)
        )
    }
}

impl From<ureq::Error> for CatalogError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => CatalogError::Status(code),
            other => CatalogError::Http(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::Task(err.to_string())
    }
}
