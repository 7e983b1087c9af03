//! Error types for the calendar Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the calendar Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication error (no session or unusable claims)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Not found error (includes ownership mismatch on mutate)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Notification API responded with a non-success status
    #[error("Delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    /// Transport-level failure talking to the notification API
    #[error("Delivery transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Configuration error (missing secret or credential)
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Local storage I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::NotFound(_) => 404,
            Error::Delivery { .. } | Error::Transport(_) => 502,
            _ => 500,
        }
    }

    /// Whether this error came from the backing database. The fallback store
    /// retries locally only for these.
    pub fn is_database(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
