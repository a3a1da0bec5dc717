use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// Errors surfaced by the shortener service to its transports.
///
/// `Duplicate`, `NotFound` and `Gone` are expected outcomes rather than
/// failures; transports translate them into domain responses.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("url already shortened as {0}")]
    Duplicate(String),
    #[error("short url not found: {0}")]
    NotFound(String),
    #[error("short url has been deleted")]
    Gone { original_url: String },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("batch is empty")]
    EmptyBatch,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
