//! Storage error types.

use std::io;
use thiserror::Error;

/// Storage operation errors.
///
/// Adapters wrap the failure of the underlying call and pass it on; the
/// predicates below classify any variant into the four error kinds callers
/// branch on (not found, unavailable, permission denied, invalid argument).
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during storage operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Object or container not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Credentials or ACL rejected by the remote system
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network, endpoint, authentication or cluster-health failure
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Malformed configuration detected while constructing a backend
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Object store error
    #[cfg(any(feature = "s3", feature = "gcs"))]
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            #[cfg(any(feature = "s3", feature = "gcs"))]
            StorageError::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            StorageError::PermissionDenied(_) => true,
            StorageError::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            #[cfg(any(feature = "s3", feature = "gcs"))]
            StorageError::ObjectStore(
                object_store::Error::PermissionDenied { .. }
                | object_store::Error::Unauthenticated { .. },
            ) => true,
            _ => false,
        }
    }

    /// Check if the backend itself could not be reached or refused to serve.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StorageError::Unavailable(_) => true,
            #[cfg(any(feature = "s3", feature = "gcs"))]
            StorageError::ObjectStore(e) => !matches!(
                e,
                object_store::Error::NotFound { .. }
                    | object_store::Error::PermissionDenied { .. }
                    | object_store::Error::Unauthenticated { .. }
                    | object_store::Error::InvalidPath { .. }
                    | object_store::Error::UnknownConfigurationKey { .. }
            ),
            _ => false,
        }
    }

    /// Check if this error stems from bad configuration.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            StorageError::InvalidArgument(_) => true,
            #[cfg(any(feature = "s3", feature = "gcs"))]
            StorageError::ObjectStore(
                object_store::Error::InvalidPath { .. }
                | object_store::Error::UnknownConfigurationKey { .. },
            ) => true,
            _ => false,
        }
    }
}
