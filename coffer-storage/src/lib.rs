//! Uniform object storage over heterogeneous backends.
//!
//! This crate provides a common `StorageBackend` trait that lets callers list,
//! fetch, write and delete objects addressed by a flat key without knowing
//! which physical system holds them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Caller                                              │
//! │        │                         ┌───────────────┐   │
//! │        ▼                         │ diff_objects  │   │
//! │  ┌────────────────┐  snapshots   │ (added /      │   │
//! │  │ StorageBackend │ ───────────▶ │  removed /    │   │
//! │  └───────┬────────┘              │  updated)     │   │
//! │          │                       └───────────────┘   │
//! │   ┌──────┼──────────┬─────────────┐                  │
//! │   ▼      ▼          ▼             ▼                  │
//! │ Local   S3         GCS        etcd (KV)              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Listing semantics
//!
//! Filesystem, S3 and GCS listings return the direct children of a prefix
//! only; keys in "subdirectories" are skipped. The key-value backend returns
//! every key sharing the prefix.
//!
//! # Quick Start
//!
//! ```no_run
//! use coffer_storage::{LocalStorage, StorageBackend};
//! use bytes::Bytes;
//!
//! # async fn example() -> coffer_storage::Result<()> {
//! let storage = LocalStorage::new("./data")?;
//!
//! storage.put_object("mychart-0.1.0.tgz", Bytes::from("chart")).await?;
//! let object = storage.get_object("mychart-0.1.0.tgz").await?;
//! assert!(object.has_extension("tgz"));
//!
//! let charts = storage.list_objects("").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Detecting changes
//!
//! ```no_run
//! use coffer_storage::{diff_objects, StorageBackend};
//! use std::time::Duration;
//!
//! # async fn example(storage: &dyn StorageBackend) -> coffer_storage::Result<()> {
//! let before = storage.list_objects("").await?;
//! // ... time passes ...
//! let after = storage.list_objects("").await?;
//! let diff = diff_objects(&before, &after, Duration::from_secs(1));
//! if diff.changed {
//!     println!("{} added, {} removed", diff.added.len(), diff.removed.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `s3` - S3 backend (default, requires `object_store`)
//! - `gcs` - Google Cloud Storage backend (default, requires `object_store`)
//! - `etcd` - etcd connection for the key-value backend
//! - `full` - Enable all features

pub mod config;
mod diff;
mod error;
mod kv;
mod local;
mod object;
pub mod path;
mod traits;

#[cfg(any(feature = "s3", feature = "gcs"))]
mod remote;

#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "gcs")]
mod gcs;

#[cfg(feature = "etcd")]
pub mod etcd;

pub use config::{AppIdentity, EtcdConfig, EtcdTlsConfig, GcsConfig, S3Config, StorageConfig};
pub use diff::{diff_objects, ObjectSliceDiff};
pub use error::{Result, StorageError};
pub use kv::{KeyValueStore, KvEntry, KvStorage};
pub use local::LocalStorage;
pub use object::{Metadata, Object};
pub use traits::StorageBackend;

#[cfg(feature = "s3")]
pub use s3::S3Storage;

#[cfg(feature = "gcs")]
pub use gcs::GcsStorage;

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Create a storage backend from configuration.
///
/// `app` is only consulted by the etcd backend, to derive a namespace when
/// none is configured.
pub async fn create_backend(
    config: &StorageConfig,
    app: &AppIdentity,
) -> Result<Box<dyn StorageBackend>> {
    match config {
        StorageConfig::Dir { path } => Ok(Box::new(LocalStorage::new(path)?)),
        #[cfg(feature = "s3")]
        StorageConfig::S3(s3_config) => Ok(Box::new(S3Storage::new(s3_config)?)),
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3(_) => Err(StorageError::InvalidArgument(
            "S3 storage requires 's3' feature".to_string(),
        )),
        #[cfg(feature = "gcs")]
        StorageConfig::Gcs(gcs_config) => Ok(Box::new(GcsStorage::new(gcs_config)?)),
        #[cfg(not(feature = "gcs"))]
        StorageConfig::Gcs(_) => Err(StorageError::InvalidArgument(
            "GCS storage requires 'gcs' feature".to_string(),
        )),
        #[cfg(feature = "etcd")]
        StorageConfig::Etcd(etcd_config) => Ok(Box::new(etcd::connect(etcd_config, app).await?)),
        #[cfg(not(feature = "etcd"))]
        StorageConfig::Etcd(_) => {
            let _ = app;
            Err(StorageError::InvalidArgument(
                "etcd storage requires 'etcd' feature".to_string(),
            ))
        }
    }
}
