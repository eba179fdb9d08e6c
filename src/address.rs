//! Content addressing
//!
//! Derives node identities from content and maps them onto a sharded
//! directory layout so no single directory grows without bound.

use crate::types::Hash;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Default shard depth for on-disk layouts
pub const DEFAULT_SHARD_DEPTH: usize = 3;

/// Compute the content hash of arbitrary bytes or text.
///
/// Returns the lowercase hex SHA-256 digest.
pub fn content_hash(data: impl AsRef<[u8]>) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Whether `hash` has the shape of a content hash: 64 lowercase hex characters.
///
/// Hashes become path components, so anything else must never reach persistence.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Directory components for a hash: component `i` is the first `i + 1` characters.
///
/// `sharded_path("abcdef", 3)` yields `["a", "ab", "abc"]`. Hashes shorter than
/// the requested depth produce repeated full-length components rather than panicking.
pub fn sharded_path(hash: &str, depth: usize) -> Vec<String> {
    (0..depth)
        .map(|i| hash.chars().take(i + 1).collect())
        .collect()
}

/// Join the shard components of `hash` onto `root`.
pub fn shard_dir(root: &std::path::Path, hash: &str, depth: usize) -> PathBuf {
    let mut dir = root.to_path_buf();
    for component in sharded_path(hash, depth) {
        dir.push(component);
    }
    dir
}

/// Today's date as `YYYY-MM-DD` (UTC), the title of the daily tag.
pub fn today_string() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Hashes of the fixed seed strings the graph is organised around.
///
/// Computed once at startup and handed to the store and scope sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownHashes {
    /// Every node links here
    pub node: Hash,
    /// Every tag links here
    pub tag: Hash,
    /// Every blob-like node links here
    pub blob: Hash,
    /// Landing node for the viewer
    pub entry_point: Hash,
}

impl WellKnownHashes {
    pub fn compute() -> Self {
        Self {
            node: content_hash("node"),
            tag: content_hash("tag"),
            blob: content_hash("blob"),
            entry_point: content_hash("entryPoint"),
        }
    }

    /// Hash of the daily tag for the given date string
    pub fn day(date: &str) -> Hash {
        content_hash(date)
    }
}

impl Default for WellKnownHashes {
    fn default() -> Self {
        Self::compute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_vector() {
        assert_eq!(
            content_hash("node"),
            "545ea538461003efdc8c81c244531b003f6f26cfccf6c0073b3239fdedf49446"
        );
        assert_eq!(content_hash(b"node".as_slice()), content_hash("node"));
    }

    #[test]
    fn test_is_valid_hash() {
        assert!(is_valid_hash(&content_hash("anything")));
        assert!(!is_valid_hash(""));
        assert!(!is_valid_hash("deadbeef"));
        assert!(!is_valid_hash(&content_hash("x").to_uppercase()));
        let traversal = format!("../../{}", &content_hash("x")[6..]);
        assert_eq!(traversal.len(), 64);
        assert!(!is_valid_hash(&traversal));
    }

    #[test]
    fn test_sharded_path_prefixes() {
        let parts = sharded_path("abcdef0123", 3);
        assert_eq!(parts, vec!["a", "ab", "abc"]);
        assert!(sharded_path("abc", 0).is_empty());
    }

    #[test]
    fn test_sharded_path_short_hash() {
        let parts = sharded_path("ab", 4);
        assert_eq!(parts, vec!["a", "ab", "ab", "ab"]);
    }

    #[test]
    fn test_shard_dir_joins_components() {
        let dir = shard_dir(std::path::Path::new("/store/meta"), "f00d", 2);
        assert_eq!(dir, PathBuf::from("/store/meta/f/f0"));
    }

    #[test]
    fn test_today_string_shape() {
        let today = today_string();
        assert_eq!(today.len(), 10);
        assert_eq!(today.as_bytes()[4], b'-');
        assert_eq!(today.as_bytes()[7], b'-');
    }

    #[test]
    fn test_well_known_are_distinct() {
        let wk = WellKnownHashes::compute();
        assert_ne!(wk.node, wk.tag);
        assert_ne!(wk.tag, wk.blob);
        assert_ne!(wk.blob, wk.entry_point);
        assert_eq!(WellKnownHashes::day("2024-01-02"), content_hash("2024-01-02"));
    }
}
