//! Local filesystem storage backend.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::ProofStorage;

/// Filesystem-backed proof storage.
///
/// Files live under a root directory and are served back through the
/// `/storage/local/{key}` application route, unless a public base URL for
/// the root is configured (e.g. a reverse proxy serving the directory).
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalStorage {
    /// Create the backend, ensuring the root directory exists.
    pub async fn new(root: PathBuf, public_base_url: Option<String>) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    /// Map a storage key to a path under the root, defusing traversal
    /// sequences rather than erroring on them.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe_key = key.replace("..", "_");
        self.root.join(safe_key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ProofStorage for LocalStorage {
    async fn save(&self, data: &[u8], key: &str) -> Result<String, StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn generate_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        match &self.public_base_url {
            Some(base) => {
                let expiry =
                    (chrono::Utc::now() + chrono::Duration::from_std(expires_in).unwrap_or_default())
                        .timestamp();
                Ok(format!("{base}/{key}?expires={expiry}"))
            }
            None => Ok(format!("/storage/local/{key}")),
        }
    }

    fn resolve_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.path_for(key))
    }
}
