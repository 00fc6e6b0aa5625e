//! Core storage trait definitions.
//!
//! The `StorageBackend` trait is the one contract every adapter (local
//! filesystem, S3, GCS, etcd) satisfies. Callers hold a
//! `Box<dyn StorageBackend>` and never learn which system sits behind it.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::diff::{diff_objects, ObjectSliceDiff};
use crate::error::Result;
use crate::object::Object;

/// Uniform object storage interface.
///
/// Keys are interpreted relative to the prefix the backend was constructed
/// with. Each call maps to one request against the underlying system; there
/// is no retry, caching or timeout here, so callers impose their own
/// deadlines.
///
/// # Thread Safety
///
/// Implementations hold only immutable configuration and a client handle,
/// so one value can serve concurrent callers without locking.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List the objects directly under `prefix`.
    ///
    /// Entries carry no payload and their paths are relative to `prefix`.
    /// A prefix that does not exist yet yields an empty list, not an error.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>>;

    /// Fetch one object with its payload and modification time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Object>;

    /// Create or overwrite the object at `key`.
    ///
    /// Missing intermediate directories/namespaces are created implicitly.
    /// After an error the state of `key` is unspecified.
    async fn put_object(&self, key: &str, data: Bytes) -> Result<()>;

    /// Write data from a byte slice.
    async fn put_bytes(&self, key: &str, data: &[u8]) -> Result<()> {
        self.put_object(key, Bytes::copy_from_slice(data)).await
    }

    /// Remove the object at `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Take a fresh snapshot of `prefix` and compare it with `previous`.
    ///
    /// Returns the new snapshot together with the changes, so it can be
    /// passed back as `previous` on the next call.
    async fn list_changes(
        &self,
        prefix: &str,
        previous: &[Object],
        tolerance: Duration,
    ) -> Result<(Vec<Object>, ObjectSliceDiff)> {
        let current = self.list_objects(prefix).await?;
        let diff = diff_objects(previous, &current, tolerance);
        Ok((current, diff))
    }

    /// Get a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;
}
