//! S3-compatible object storage backend.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::error::StorageError;
use super::ProofStorage;

/// Object-storage-backed proof storage.
///
/// Files are fetched by the browser directly from the bucket, either via a
/// public/CDN base URL or a presigned GET link. There is no local path for
/// stored objects, so `resolve_path` reports the capability as unsupported.
pub struct S3Storage {
    client: Client,
    bucket: String,
    base_path: Option<String>,
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Build the client from the default AWS credential chain plus the
    /// optional region/endpoint overrides.
    pub async fn new(
        bucket: String,
        region: Option<String>,
        base_path: Option<String>,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            // Path-style addressing keeps S3-compatible stores (MinIO etc.) working.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Self {
            client,
            bucket,
            base_path: base_path.map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty()),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Prefix the storage key with the configured base path.
    fn object_key(&self, key: &str) -> String {
        let clean = key.trim_start_matches('/');
        match &self.base_path {
            Some(base) => format!("{base}/{clean}"),
            None => clean.to_string(),
        }
    }
}

#[async_trait]
impl ProofStorage for S3Storage {
    async fn save(&self, data: &[u8], key: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn generate_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let object_key = self.object_key(key);
        if let Some(base) = &self.public_base_url {
            return Ok(format!("{base}/{object_key}"));
        }

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    fn resolve_path(&self, _key: &str) -> Result<PathBuf, StorageError> {
        Err(StorageError::Unsupported("local file paths"))
    }
}
