//! Pluggable proof file storage.
//!
//! Two backends implement [`ProofStorage`]: the local filesystem (files are
//! served back through an application route) and S3-compatible object
//! storage (files are served via presigned or public URLs). The backend is
//! selected by configuration at startup. `resolve_path` is a capability
//! only the local backend has; remote backends return a typed
//! [`StorageError::Unsupported`] instead of panicking.

mod error;
mod local;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use error::StorageError;
pub use local::LocalStorage;
pub use s3::S3Storage;

use crate::config::StorageConfig;

/// Uniform interface for persisting and retrieving proof files.
#[async_trait]
pub trait ProofStorage: Send + Sync {
    /// Persist the bytes under `key` and return the storage key.
    async fn save(&self, data: &[u8], key: &str) -> Result<String, StorageError>;

    /// Remove a stored file. Missing keys are a no-op.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// A URL the browser can fetch the file from, valid at least `expires_in`.
    async fn generate_url(&self, key: &str, expires_in: Duration)
        -> Result<String, StorageError>;

    /// The absolute local filesystem path for a stored file.
    ///
    /// Only supported by the local backend; remote backends return
    /// [`StorageError::Unsupported`].
    fn resolve_path(&self, key: &str) -> Result<std::path::PathBuf, StorageError>;
}

/// Default URL validity for generated file links.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

/// Construct the configured storage backend.
pub async fn build_storage(config: &StorageConfig) -> Result<Arc<dyn ProofStorage>, StorageError> {
    match config {
        StorageConfig::Local {
            root,
            public_base_url,
        } => {
            let storage = LocalStorage::new(root.into(), public_base_url.clone()).await?;
            Ok(Arc::new(storage))
        }
        StorageConfig::S3 {
            bucket,
            region,
            base_path,
            endpoint_url,
            public_base_url,
        } => {
            let storage = S3Storage::new(
                bucket.clone(),
                region.clone(),
                base_path.clone(),
                endpoint_url.clone(),
                public_base_url.clone(),
            )
            .await;
            Ok(Arc::new(storage))
        }
    }
}
