//! Local filesystem storage implementation.
//!
//! Keys map to files under a root directory. Listing reads exactly one
//! directory level: subdirectories are skipped, never descended into.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::error::{Result, StorageError};
use crate::object::Object;
use crate::traits::StorageBackend;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend rooted at `root`.
    ///
    /// A relative root is resolved against the current directory once, here.
    /// The directory itself is created lazily by the first write.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root })
    }

    /// Get the absolute root for this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a file under the root. `.` and `..` segments are rejected
    /// so a key never resolves outside the root.
    fn to_fs_path(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|segment| !segment.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StorageError::InvalidArgument(format!(
                    "key '{}' contains a relative path segment",
                    key
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Ensure parent directories exist for a path.
    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn not_found_or(key: &str, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        err.into()
    }
}

fn modified(metadata: &std::fs::Metadata) -> Result<DateTime<Utc>> {
    Ok(DateTime::<Utc>::from(metadata.modified()?))
}

#[async_trait]
impl StorageBackend for LocalStorage {
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>> {
        let dir = self.to_fs_path(prefix)?;
        debug!("Listing {:?}", dir);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // The directory may simply not have been written to yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping non UTF-8 file name {:?}", entry.path());
                continue;
            };
            objects.push(Object::listed(name, modified(&metadata)?));
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_object(&self, key: &str) -> Result<Object> {
        let fs_path = self.to_fs_path(key)?;
        debug!("Reading from {:?}", fs_path);

        let data = fs::read(&fs_path).await.map_err(|e| not_found_or(key, e))?;
        let metadata = fs::metadata(&fs_path)
            .await
            .map_err(|e| not_found_or(key, e))?;

        Ok(Object::listed(key, modified(&metadata)?).with_data(data))
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let fs_path = self.to_fs_path(key)?;
        self.ensure_parent(&fs_path).await?;

        debug!("Writing {} bytes to {:?}", data.len(), fs_path);
        fs::write(&fs_path, &data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete_object(&self, key: &str) -> Result<()> {
        let fs_path = self.to_fs_path(key)?;
        debug!("Deleting {:?}", fs_path);

        fs::remove_file(&fs_path)
            .await
            .map_err(|e| not_found_or(key, e))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
