//! Key-value storage backend.
//!
//! Objects are stored as values under `namespace + key`. Unlike the
//! filesystem and object-store backends, listing is a plain prefix range
//! scan: keys are not flattened, so `charts/stable/a.tgz` shows up when
//! listing `charts`. Listed paths are relative to the namespace only.
//!
//! The store itself sits behind [`KeyValueStore`]; with the `etcd` feature
//! an etcd client implements it.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::object::{Metadata, Object};
use crate::traits::StorageBackend;

/// One entry returned by a key-value store.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    /// Full key, namespace included
    pub key: String,
    pub value: Bytes,
    /// Number of writes to this key since its creation
    pub version: i64,
}

/// Minimal key-value operations the storage backend needs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a single key.
    async fn get(&self, key: &str) -> Result<Option<KvEntry>>;

    /// Fetch every key starting with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<KvEntry>>;

    /// Create or overwrite a key.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Delete a key, returning how many keys were removed.
    async fn delete(&self, key: &str) -> Result<u64>;
}

/// Storage backend over a namespaced key-value store.
#[derive(Clone)]
pub struct KvStorage {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl KvStorage {
    /// Wrap a key-value store; every key is placed under `namespace`.
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn to_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn to_object(&self, entry: &KvEntry) -> Object {
        let path = entry
            .key
            .strip_prefix(&self.namespace)
            .unwrap_or(&entry.key)
            .to_string();
        // Key-value stores keep no modification time.
        let meta = Metadata {
            name: path.clone(),
            version: entry.version.to_string(),
        };
        Object::listed(path, DateTime::<Utc>::UNIX_EPOCH).with_meta(meta)
    }
}

impl std::fmt::Debug for KvStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStorage")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for KvStorage {
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>> {
        let scan = self.to_key(prefix);
        debug!("Scanning keys with prefix {}", scan);

        let entries = self.store.scan_prefix(&scan).await?;
        Ok(entries.iter().map(|entry| self.to_object(entry)).collect())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_object(&self, key: &str) -> Result<Object> {
        let full_key = self.to_key(key);
        debug!("Reading key {}", full_key);

        match self.store.get(&full_key).await? {
            Some(entry) => Ok(self.to_object(&entry).with_data(entry.value)),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let full_key = self.to_key(key);
        debug!("Writing {} bytes to key {}", data.len(), full_key);

        self.store.put(&full_key, data).await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete_object(&self, key: &str) -> Result<()> {
        let full_key = self.to_key(key);
        debug!("Deleting key {}", full_key);

        match self.store.delete(&full_key).await? {
            0 => Err(StorageError::NotFound(key.to_string())),
            _ => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "etcd"
    }
}
