//! S3-compatible object storage backend.
//!
//! Uses the `object_store` crate for S3, MinIO, and other S3-compatible
//! services. Listing pages through the bucket with continuation tokens
//! inside `object_store`; this adapter consumes the resulting stream.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! type = "s3"
//! bucket = "charts"
//! region = "us-east-1"
//! prefix = "stable/"
//!
//! # Optional: For MinIO or other S3-compatible services
//! endpoint = "http://localhost:9000"
//!
//! # Optional: sent with every write
//! server_side_encryption = "AES256"
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::instrument;

use crate::config::S3Config;
use crate::error::{Result, StorageError};
use crate::object::Object;
use crate::remote::PrefixedStore;
use crate::traits::StorageBackend;

/// S3-compatible object storage backend.
#[derive(Debug, Clone)]
pub struct S3Storage {
    inner: PrefixedStore,
}

fn config_key(name: &str) -> Result<AmazonS3ConfigKey> {
    name.parse()
        .map_err(|e: object_store::Error| StorageError::InvalidArgument(e.to_string()))
}

impl S3Storage {
    /// Create a new S3 storage backend from configuration.
    pub fn new(config: &S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidArgument(
                "S3 storage requires a bucket".to_string(),
            ));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_allow_http(config.allow_http());

        if !config.region.is_empty() {
            builder = builder.with_region(&config.region);
        }

        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            builder = builder.with_endpoint(endpoint);
        }

        if config.force_path_style() {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        if let Some(sse) = config.server_side_encryption.as_deref().filter(|s| !s.is_empty()) {
            builder = builder.with_config(config_key("aws_server_side_encryption")?, sse);
            if let Some(kms_key) = &config.sse_kms_key_id {
                builder = builder.with_config(config_key("aws_sse_kms_key_id")?, kms_key);
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::InvalidArgument(e.to_string()))?;

        Ok(Self::from_store(Arc::new(store), &config.prefix))
    }

    /// Create from an existing ObjectStore instance.
    pub fn from_store(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            inner: PrefixedStore::new(store, prefix, "s3"),
        }
    }

    /// The cleaned key prefix.
    pub fn prefix(&self) -> &str {
        self.inner.prefix()
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>> {
        self.inner.list(prefix).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_object(&self, key: &str) -> Result<Object> {
        self.inner.get(key).await
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        self.inner.put(key, data).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete_object(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_new_requires_bucket() {
        let err = S3Storage::new(&S3Config::aws("", "us-west-2")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_new_cleans_prefix() {
        let config = S3Config::minio("local-bucket", "http://localhost:9000")
            .with_credentials("minioadmin", "minioadmin")
            .with_prefix("/unittest/");
        let storage = S3Storage::new(&config).unwrap();
        assert_eq!(storage.prefix(), "unittest");
    }

    #[test]
    fn test_new_with_sse() {
        let config = S3Config::aws("my-bucket", "us-west-2")
            .with_credentials("key", "secret")
            .with_server_side_encryption("AES256");
        assert!(S3Storage::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_flattening_from_store() {
        let storage = S3Storage::from_store(Arc::new(InMemory::new()), "charts");

        storage.put_bytes("mychart-0.1.0.tgz", b"chart").await.unwrap();
        storage.put_bytes("sub/dir/file.txt", b"nested").await.unwrap();

        let objects = storage.list_objects("").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].path, "mychart-0.1.0.tgz");
        assert!(objects[0].has_extension("tgz"));
    }

    // Integration tests require actual S3/MinIO - run with:
    // TEST_STORAGE_AWS_BUCKET=... TEST_STORAGE_AWS_REGION=... cargo test -p coffer-storage -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_s3_integration() {
        let bucket = std::env::var("TEST_STORAGE_AWS_BUCKET").unwrap();
        let region = std::env::var("TEST_STORAGE_AWS_REGION").unwrap();
        let prefix = format!("unittest/{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
        let storage = S3Storage::new(&S3Config::aws(bucket, region).with_prefix(prefix)).unwrap();

        let data = Bytes::from("integration test data");
        storage.put_object("integration.txt", data.clone()).await.unwrap();

        let object = storage.get_object("integration.txt").await.unwrap();
        assert_eq!(object.data, data);

        storage.delete_object("integration.txt").await.unwrap();
        assert!(storage.get_object("integration.txt").await.unwrap_err().is_not_found());
    }
}
