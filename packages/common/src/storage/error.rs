use thiserror::Error;

/// Errors that can occur during asset storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The object key is empty or escapes the store root.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// The backend accepted the write but did not report decoded image
    /// dimensions and format.
    #[error("image info unavailable for {key}: {reason}")]
    MissingImageInfo { key: String, reason: String },

    /// The remote backend rejected or failed the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}
