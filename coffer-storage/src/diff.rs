//! Change detection between two listings of the same backend.
//!
//! Two snapshots taken at different times are compared by path. An object
//! present in both counts as updated only when its modification time moved
//! forward by strictly more than a tolerance, which absorbs clock and
//! metadata jitter between listings.

use std::collections::HashMap;
use std::time::Duration;

use crate::object::Object;

/// Delta between two object listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSliceDiff {
    /// True iff any of the three sets is non-empty
    pub changed: bool,
    /// In the previous listing only
    pub removed: Vec<Object>,
    /// In the current listing only
    pub added: Vec<Object>,
    /// In both, current entry newer by more than the tolerance
    pub updated: Vec<Object>,
}

/// Compare two listings.
///
/// `removed` and `updated` follow the order of `prev`, `added` follows the
/// order of `curr`. `updated` carries the entry from `curr`.
pub fn diff_objects(prev: &[Object], curr: &[Object], tolerance: Duration) -> ObjectSliceDiff {
    let previous: HashMap<&str, &Object> = prev.iter().map(|o| (o.path.as_str(), o)).collect();
    let current: HashMap<&str, &Object> = curr.iter().map(|o| (o.path.as_str(), o)).collect();

    let mut diff = ObjectSliceDiff::default();

    for p in prev {
        match current.get(p.path.as_str()) {
            Some(c) if is_newer(p, c, tolerance) => diff.updated.push((*c).clone()),
            Some(_) => {}
            None => diff.removed.push(p.clone()),
        }
    }

    for c in curr {
        if !previous.contains_key(c.path.as_str()) {
            diff.added.push(c.clone());
        }
    }

    diff.changed = !(diff.removed.is_empty() && diff.added.is_empty() && diff.updated.is_empty());
    diff
}

fn is_newer(prev: &Object, curr: &Object, tolerance: Duration) -> bool {
    // A negative delta fails the conversion and never counts as an update.
    match (curr.last_modified - prev.last_modified).to_std() {
        Ok(delta) => delta > tolerance,
        Err(_) => false,
    }
}
