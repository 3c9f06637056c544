/// Error type for proof file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem-level failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key does not exist in the backend.
    #[error("Stored file not found: {0}")]
    NotFound(String),

    /// The backend does not support the requested capability.
    #[error("Operation not supported by this storage backend: {0}")]
    Unsupported(&'static str),

    /// Remote backend failure (S3 request error et al.).
    #[error("Storage backend error: {0}")]
    Backend(String),
}
