//! The object value moved across every backend.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::SEPARATOR;

/// Name/version pair attached to an object.
///
/// Only the key-value backend fills this in; the other backends leave it
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
}

/// One stored item as seen by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Key relative to the backend prefix, `/` separated
    pub path: String,
    /// Payload; empty for listing entries
    pub data: Bytes,
    /// Write time as reported by the backend
    pub last_modified: DateTime<Utc>,
    pub meta: Metadata,
}

impl Object {
    /// Create a listing entry (no payload).
    pub fn listed(path: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            data: Bytes::new(),
            last_modified,
            meta: Metadata::default(),
        }
    }

    /// Attach a payload.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Attach metadata.
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the final extension of the path is exactly `extension`.
    ///
    /// The extension is the text after the last `.` of the last path
    /// segment; the comparison is case-sensitive.
    pub fn has_extension(&self, extension: &str) -> bool {
        let name = self.path.rsplit(SEPARATOR).next().unwrap_or_default();
        match name.rfind('.') {
            Some(dot) => &name[dot + 1..] == extension,
            None => false,
        }
    }
}
