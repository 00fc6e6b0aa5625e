//! Prefix handling shared by the `object_store` based backends.
//!
//! S3 and GCS are flat key spaces. Both adapters wrap an `ObjectStore` with a
//! fixed key prefix and emulate one directory level on listing: the store's
//! paginated listing stream is pulled to exhaustion and every key is stripped
//! of the list prefix; keys that still contain a separator belong to a
//! "subdirectory" and are dropped.

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::object::Object;
use crate::path::{clean_prefix, join_key, object_path_is_invalid, remove_prefix_from_object_path};

fn parse_location(raw: &str) -> Result<ObjectPath> {
    ObjectPath::parse(raw)
        .map_err(|e| StorageError::InvalidArgument(format!("invalid object key '{}': {}", raw, e)))
}

/// An object store plus the prefix every key lives under.
#[derive(Clone)]
pub(crate) struct PrefixedStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    scheme: &'static str,
}

impl PrefixedStore {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, prefix: &str, scheme: &'static str) -> Self {
        Self {
            store,
            prefix: clean_prefix(prefix),
            scheme,
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical location of a caller key, stored unencoded.
    pub(crate) fn location(&self, key: &str) -> Result<ObjectPath> {
        parse_location(&join_key(&self.prefix, key))
    }

    fn map_err(key: &str, err: object_store::Error) -> StorageError {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::from(other),
        }
    }

    pub(crate) async fn list(&self, prefix: &str) -> Result<Vec<Object>> {
        let list_prefix = join_key(&self.prefix, prefix);
        let location = if list_prefix.is_empty() {
            None
        } else {
            Some(parse_location(&list_prefix)?)
        };
        debug!("Listing {}://{}", self.scheme, list_prefix);

        let mut objects = Vec::new();
        let mut stream = self.store.list(location.as_ref());

        while let Some(meta) = stream.try_next().await.map_err(StorageError::from)? {
            let key = remove_prefix_from_object_path(&list_prefix, meta.location.as_ref());
            if object_path_is_invalid(&key) {
                continue;
            }
            objects.push(Object::listed(key, meta.last_modified));
        }

        Ok(objects)
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Object> {
        let location = self.location(key)?;
        debug!("Reading from {}://{}", self.scheme, location);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| Self::map_err(key, e))?;
        let last_modified = result.meta.last_modified;
        let data = result.bytes().await.map_err(|e| Self::map_err(key, e))?;

        Ok(Object::listed(key, last_modified).with_data(data))
    }

    pub(crate) async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let location = self.location(key)?;
        debug!("Writing {} bytes to {}://{}", data.len(), self.scheme, location);

        self.store
            .put(&location, data.into())
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        let location = self.location(key)?;
        debug!("Deleting {}://{}", self.scheme, location);

        // Object stores acknowledge deletes of absent keys; a missing key
        // must still report NotFound.
        self.store
            .head(&location)
            .await
            .map_err(|e| Self::map_err(key, e))?;
        self.store
            .delete(&location)
            .await
            .map_err(|e| Self::map_err(key, e))
    }
}

impl std::fmt::Debug for PrefixedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixedStore")
            .field("scheme", &self.scheme)
            .field("prefix", &self.prefix)
            .finish()
    }
}
