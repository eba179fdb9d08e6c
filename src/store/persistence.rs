//! Node persistence
//!
//! Files live under a sharded layout:
//! `<root>/meta/<shard>/<hash>.json`, `<root>/blob/<shard>/<hash><ext>` and
//! `<root>/org/<shard>/<hash>.org`.

use crate::address::{is_valid_hash, shard_dir, DEFAULT_SHARD_DEPTH};
use crate::error::StorageError;
use crate::node::Node;
use crate::types::Hash;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Durable side of the node store
pub trait NodePersistence: Send + Sync {
    /// Raw node document, `None` when no file exists
    fn read_node(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn write_node(&self, hash: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Returns whether a file was removed
    fn remove_node(&self, hash: &str) -> Result<bool, StorageError>;

    fn read_binary(&self, hash: &str, extension: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn write_binary(&self, hash: &str, extension: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn remove_binary(&self, hash: &str, extension: &str) -> Result<bool, StorageError>;

    /// Hashes of every persisted node document
    fn list_all_node_files(&self) -> Result<Vec<Hash>, StorageError>;

    /// Create the companion document for `node` if it does not exist yet.
    ///
    /// Returns whether a file was written.
    fn ensure_companion(&self, node: &Node) -> Result<bool, StorageError>;
}

/// Directory names and shard depth of an on-disk store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub root: PathBuf,
    pub meta_dir: String,
    pub blob_dir: String,
    pub org_dir: String,
    pub depth: usize,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            meta_dir: "meta".to_string(),
            blob_dir: "blob".to_string(),
            org_dir: "org".to_string(),
            depth: DEFAULT_SHARD_DEPTH,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn meta_root(&self) -> PathBuf {
        self.root.join(&self.meta_dir)
    }

    pub fn blob_root(&self) -> PathBuf {
        self.root.join(&self.blob_dir)
    }

    pub fn org_root(&self) -> PathBuf {
        self.root.join(&self.org_dir)
    }

    pub fn meta_path(&self, hash: &str) -> PathBuf {
        shard_dir(&self.meta_root(), hash, self.depth).join(format!("{}.json", hash))
    }

    pub fn blob_path(&self, hash: &str, extension: &str) -> PathBuf {
        shard_dir(&self.blob_root(), hash, self.depth).join(format!("{}{}", hash, extension))
    }

    pub fn org_path(&self, hash: &str) -> PathBuf {
        shard_dir(&self.org_root(), hash, self.depth).join(format!("{}.org", hash))
    }
}

/// Local filesystem persistence
#[derive(Debug, Clone)]
pub struct FsPersistence {
    layout: StorageLayout,
}

impl FsPersistence {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

/// Hashes become path components; only well-formed ones may touch disk.
fn checked(hash: &str) -> Result<&str, StorageError> {
    if is_valid_hash(hash) {
        Ok(hash)
    } else {
        Err(StorageError::InvalidNode {
            hash: hash.to_string(),
            reason: "hash is not 64 lowercase hex characters".to_string(),
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

fn write_creating_dirs(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| StorageError::io(path, e))
}

fn remove_optional(path: &Path) -> Result<bool, StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

impl NodePersistence for FsPersistence {
    fn read_node(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError> {
        read_optional(&self.layout.meta_path(checked(hash)?))
    }

    fn write_node(&self, hash: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.layout.meta_path(checked(hash)?);
        tracing::debug!("Writing node {} to {}", hash, path.display());
        write_creating_dirs(&path, bytes)
    }

    fn remove_node(&self, hash: &str) -> Result<bool, StorageError> {
        remove_optional(&self.layout.meta_path(checked(hash)?))
    }

    fn read_binary(&self, hash: &str, extension: &str) -> Result<Option<Vec<u8>>, StorageError> {
        read_optional(&self.layout.blob_path(checked(hash)?, extension))
    }

    fn write_binary(&self, hash: &str, extension: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.layout.blob_path(checked(hash)?, extension);
        tracing::debug!("Writing blob {}{} ({} bytes)", hash, extension, bytes.len());
        write_creating_dirs(&path, bytes)
    }

    fn remove_binary(&self, hash: &str, extension: &str) -> Result<bool, StorageError> {
        remove_optional(&self.layout.blob_path(checked(hash)?, extension))
    }

    fn list_all_node_files(&self) -> Result<Vec<Hash>, StorageError> {
        let root = self.layout.meta_root();
        if !root.exists() {
            tracing::warn!("Meta directory {} does not exist", root.display());
            return Ok(Vec::new());
        }

        let mut hashes = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension() != Some(std::ffi::OsStr::new("json")) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_hash(stem) => hashes.push(stem.to_string()),
                Some(stem) => tracing::warn!("Skipping node file with malformed hash {:?}", stem),
                None => tracing::warn!("Invalid node filename non UTF8: {:?}", path),
            }
        }
        Ok(hashes)
    }

    fn ensure_companion(&self, node: &Node) -> Result<bool, StorageError> {
        let path = self.layout.org_path(checked(&node.hash)?);
        if path.exists() {
            return Ok(false);
        }
        let document = format!(
            "#+TITLE:{}\n#+DATE:{}\n\n* {}\n{}\n",
            node.title, node.created_at, node.title, node.description
        );
        write_creating_dirs(&path, document.as_bytes())?;
        Ok(true)
    }
}
