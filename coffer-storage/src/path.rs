//! Flat object keys and backend prefixes.
//!
//! Every backend addresses objects by a `/`-separated key relative to a fixed
//! prefix. Prefix-keyed stores (S3, GCS) have no real directories, so listing
//! one "level" is simulated: the listed key is stripped of the list prefix
//! and anything that still contains a separator lives in a subdirectory and
//! is skipped.
//!
//! ```
//! use coffer_storage::path::{clean_prefix, object_path_is_invalid, remove_prefix_from_object_path};
//!
//! let prefix = clean_prefix("/charts/stable/");
//! assert_eq!(prefix, "charts/stable");
//!
//! let key = remove_prefix_from_object_path(&prefix, "charts/stable/mychart-0.1.0.tgz");
//! assert_eq!(key, "mychart-0.1.0.tgz");
//! assert!(!object_path_is_invalid(&key));
//!
//! let nested = remove_prefix_from_object_path(&prefix, "charts/stable/old/mychart-0.0.1.tgz");
//! assert!(object_path_is_invalid(&nested));
//! ```

/// Hierarchy separator used by every backend.
pub const SEPARATOR: char = '/';

/// Strip leading and trailing separators from a configured backend prefix.
pub fn clean_prefix(prefix: &str) -> String {
    prefix.trim_matches(SEPARATOR).to_string()
}

/// Remove one leading `prefix/` from a raw backend key.
///
/// Apply once per listed key, when the key is turned into an `Object`.
pub fn remove_prefix_from_object_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(path)
        .to_string()
}

/// True for keys that do not name a direct child of the listed prefix.
pub fn object_path_is_invalid(path: &str) -> bool {
    path.is_empty() || path.contains(SEPARATOR)
}

/// Join a backend prefix and a caller key into one physical key.
///
/// Empty segments are dropped, so neither `base` nor `key` needs to be
/// normalized by the caller.
pub fn join_key(base: &str, key: &str) -> String {
    base.split(SEPARATOR)
        .chain(key.split(SEPARATOR))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_prefix() {
        assert_eq!(clean_prefix("/unittest/20240101/"), "unittest/20240101");
        assert_eq!(clean_prefix("charts"), "charts");
        assert_eq!(clean_prefix("///"), "");
        assert_eq!(clean_prefix(""), "");
    }

    #[test]
    fn test_clean_prefix_idempotent() {
        let once = clean_prefix("/a/b/");
        assert_eq!(clean_prefix(&once), once);
    }

    #[test]
    fn test_remove_prefix_empty_prefix() {
        assert_eq!(remove_prefix_from_object_path("", "a/b.txt"), "a/b.txt");
    }

    #[test]
    fn test_remove_prefix_only_once() {
        assert_eq!(remove_prefix_from_object_path("p", "p/p/x.txt"), "p/x.txt");
    }

    #[test]
    fn test_remove_prefix_not_leading() {
        // The prefix must be at the start of the key, not anywhere in it.
        assert_eq!(remove_prefix_from_object_path("p", "q/p/x.txt"), "q/p/x.txt");
        // A sibling that merely shares the leading characters is untouched.
        assert_eq!(remove_prefix_from_object_path("p", "pfile.txt"), "pfile.txt");
    }

    #[test]
    fn test_object_path_is_invalid() {
        assert!(object_path_is_invalid(""));
        assert!(object_path_is_invalid("this/is/a/skipped/object.txt"));
        assert!(!object_path_is_invalid("test1.txt"));
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("", "test1.txt"), "test1.txt");
        assert_eq!(join_key("unittest/ts", "test1.txt"), "unittest/ts/test1.txt");
        assert_eq!(join_key("unittest/ts/", "/sub/file.txt"), "unittest/ts/sub/file.txt");
        assert_eq!(join_key("unittest", ""), "unittest");
        assert_eq!(join_key("", ""), "");
    }
}
