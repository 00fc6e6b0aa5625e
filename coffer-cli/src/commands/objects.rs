use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use coffer_storage::{Bytes, Metadata, Object, ObjectSliceDiff, StorageBackend};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::output::{write_value, OutputFormat};

/// Listing entry as printed by `objects list`.
#[derive(Debug, Serialize)]
struct ListedObject<'a> {
    path: &'a str,
    last_modified: DateTime<Utc>,
}

/// Object summary as printed by `objects get`.
#[derive(Debug, Serialize)]
struct ObjectInfo<'a> {
    path: &'a str,
    size: usize,
    last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "is_empty_meta")]
    meta: &'a Metadata,
}

fn is_empty_meta(meta: &&Metadata) -> bool {
    meta.name.is_empty() && meta.version.is_empty()
}

pub async fn run_list<W: Write>(
    storage: &dyn StorageBackend,
    prefix: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let objects = storage.list_objects(prefix).await?;
    let listed: Vec<_> = objects
        .iter()
        .map(|o| ListedObject {
            path: &o.path,
            last_modified: o.last_modified,
        })
        .collect();
    write_value(out, format, &listed)
}

pub async fn run_get<W: Write>(
    storage: &dyn StorageBackend,
    path: &str,
    format: OutputFormat,
    data_file: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    let object = storage.get_object(path).await?;

    if let Some(file) = data_file {
        tokio::fs::write(file, &object.data)
            .await
            .with_context(|| format!("writing object data to {}", file.display()))?;
        info!("Wrote {} bytes to {}", object.size(), file.display());
    }

    let info = ObjectInfo {
        path: &object.path,
        size: object.size(),
        last_modified: object.last_modified,
        meta: &object.meta,
    };
    write_value(out, format, &info)
}

pub async fn run_put(storage: &dyn StorageBackend, path: &str, file: Option<&Path>) -> Result<()> {
    let data = match file {
        Some(file) => tokio::fs::read(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };

    let size = data.len();
    storage.put_object(path, Bytes::from(data)).await?;
    info!("Stored {} ({} bytes) in {} storage", path, size, storage.backend_name());
    Ok(())
}

pub async fn run_delete(storage: &dyn StorageBackend, path: &str) -> Result<()> {
    storage.delete_object(path).await?;
    info!("Deleted {} from {} storage", path, storage.backend_name());
    Ok(())
}

/// Options accepted by `objects sync`.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub recursive: bool,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
}

pub async fn run_sync(options: &SyncOptions) -> Result<()> {
    warn!(
        source = %options.source.display(),
        destination = %options.destination.display(),
        recursive = options.recursive,
        exclude = ?options.exclude,
        include = ?options.include,
        "objects sync is not implemented"
    );
    Ok(())
}

/// One polling step of `objects watch`.
///
/// Returns the new snapshot together with its diff against `previous`.
pub async fn poll_changes(
    storage: &dyn StorageBackend,
    prefix: &str,
    previous: &[Object],
    tolerance: Duration,
) -> Result<(Vec<Object>, ObjectSliceDiff)> {
    let (current, diff) = storage.list_changes(prefix, previous, tolerance).await?;
    if diff.changed {
        let paths = |objects: &[Object]| -> Vec<String> {
            objects.iter().map(|o| o.path.clone()).collect()
        };
        info!(
            added = ?paths(&diff.added),
            removed = ?paths(&diff.removed),
            updated = ?paths(&diff.updated),
            "Objects changed under '{}'",
            prefix
        );
    }
    Ok((current, diff))
}

/// Poll `prefix` every `interval` and log what changed. Runs until cancelled.
pub async fn run_watch(
    storage: &dyn StorageBackend,
    prefix: &str,
    interval: Duration,
    tolerance: Duration,
) -> Result<()> {
    let mut snapshot = storage.list_objects(prefix).await?;
    info!(
        "Watching '{}' in {} storage ({} objects)",
        prefix,
        storage.backend_name(),
        snapshot.len()
    );

    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match poll_changes(storage, prefix, &snapshot, tolerance).await {
            Ok((current, _)) => snapshot = current,
            Err(e) => warn!("Listing '{}' failed: {:#}", prefix, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_storage::LocalStorage;
    use tempfile::TempDir;

    fn storage() -> (TempDir, LocalStorage) {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        (temp, storage)
    }

    #[tokio::test]
    async fn test_list_json() {
        let (_temp, storage) = storage();
        storage.put_bytes("b.tgz", b"b").await.unwrap();
        storage.put_bytes("a.tgz", b"a").await.unwrap();

        let mut out = Vec::new();
        run_list(&storage, "", OutputFormat::Json, &mut out).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let paths: Vec<_> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["a.tgz", "b.tgz"]);
    }

    #[tokio::test]
    async fn test_get_writes_data_file() {
        let (temp, storage) = storage();
        storage.put_bytes("index.yaml", b"entries: {}").await.unwrap();

        let data_file = temp.path().join("download.yaml");
        let mut out = Vec::new();
        run_get(
            &storage,
            "index.yaml",
            OutputFormat::Yaml,
            Some(&data_file),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&data_file).unwrap(), b"entries: {}");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("path: index.yaml"));
        assert!(text.contains("size: 11"));
        assert!(!text.contains("meta"));
    }

    #[tokio::test]
    async fn test_put_from_file_and_delete() {
        let (temp, storage) = storage();
        let source = temp.path().join("upload.bin");
        std::fs::write(&source, b"payload").unwrap();

        run_put(&storage, "charts/upload.bin", Some(&source)).await.unwrap();
        let object = storage.get_object("charts/upload.bin").await.unwrap();
        assert_eq!(object.data, Bytes::from("payload"));

        run_delete(&storage, "charts/upload.bin").await.unwrap();
        assert!(run_delete(&storage, "charts/upload.bin").await.is_err());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_temp, storage) = storage();
        let mut out = Vec::new();
        let err = run_get(&storage, "missing", OutputFormat::Json, None, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_poll_changes() {
        let (_temp, storage) = storage();
        storage.put_bytes("old.txt", b"old").await.unwrap();
        let (snapshot, diff) = poll_changes(&storage, "", &[], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(diff.added.len(), 1);

        storage.put_bytes("new.txt", b"new").await.unwrap();
        storage.delete_object("old.txt").await.unwrap();
        let (_, diff) = poll_changes(&storage, "", &snapshot, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(diff.changed);
        assert_eq!(diff.added[0].path, "new.txt");
        assert_eq!(diff.removed[0].path, "old.txt");
    }

    #[tokio::test]
    async fn test_sync_is_noop() {
        let options = SyncOptions {
            source: "src".into(),
            destination: "dst".into(),
            ..Default::default()
        };
        run_sync(&options).await.unwrap();
    }
}
