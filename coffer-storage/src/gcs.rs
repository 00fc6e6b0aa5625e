//! Google Cloud Storage backend.
//!
//! Credentials come from the configured service account file, or from the
//! application default credentials when none is given.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::instrument;

use crate::config::GcsConfig;
use crate::error::{Result, StorageError};
use crate::object::Object;
use crate::remote::PrefixedStore;
use crate::traits::StorageBackend;

/// Google Cloud Storage backend.
#[derive(Debug, Clone)]
pub struct GcsStorage {
    inner: PrefixedStore,
}

impl GcsStorage {
    /// Create a new GCS storage backend from configuration.
    pub fn new(config: &GcsConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidArgument(
                "GCS storage requires a bucket".to_string(),
            ));
        }

        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(&config.bucket);
        if let Some(credentials) = &config.credentials_file {
            builder = builder.with_service_account_path(credentials.to_string_lossy());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::InvalidArgument(e.to_string()))?;

        Ok(Self::from_store(Arc::new(store), &config.prefix))
    }

    /// Create from an existing ObjectStore instance.
    pub fn from_store(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            inner: PrefixedStore::new(store, prefix, "gs"),
        }
    }

    /// The cleaned key prefix.
    pub fn prefix(&self) -> &str {
        self.inner.prefix()
    }
}

#[async_trait]
impl StorageBackend for GcsStorage {
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
        "gcs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_new_requires_bucket() {
        let err = GcsStorage::new(&GcsConfig::default()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_roundtrip_from_store() {
        let storage = GcsStorage::from_store(Arc::new(InMemory::new()), "/unittest/");
        assert_eq!(storage.prefix(), "unittest");

        storage.put_bytes("test1.txt", b"test content 1").await.unwrap();
        let object = storage.get_object("test1.txt").await.unwrap();
        assert_eq!(object.data, Bytes::from("test content 1"));
        assert_eq!(object.meta, Default::default());
    }

    #[tokio::test]
    async fn test_nested_key_not_listed() {
        let storage = GcsStorage::from_store(Arc::new(InMemory::new()), "p");
        storage.put_bytes("sub/dir/file.txt", b"nested").await.unwrap();

        assert!(storage.list_objects("").await.unwrap().is_empty());
        assert!(storage.get_object("sub/dir/file.txt").await.is_ok());
    }

    // Requires TEST_STORAGE_GOOGLE_BUCKET and application default credentials.
    #[tokio::test]
    #[ignore]
    async fn test_gcs_integration() {
        let bucket = std::env::var("TEST_STORAGE_GOOGLE_BUCKET").unwrap();
        let prefix = format!("unittest/{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
        let storage = GcsStorage::new(&GcsConfig::new(bucket).with_prefix(prefix)).unwrap();

        storage.put_bytes("integration.txt", b"data").await.unwrap();
        let listed = storage.list_objects("").await.unwrap();
        assert_eq!(listed.len(), 1);
        storage.delete_object("integration.txt").await.unwrap();
    }
}
