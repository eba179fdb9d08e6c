//! StorageConfig and resolution of the on-disk store location.

use super::MAX_SHARD_DEPTH;
use crate::address::DEFAULT_SHARD_DEPTH;
use crate::error::ApiError;
use crate::store::StorageLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_meta_dir() -> String {
    "meta".to_string()
}

fn default_blob_dir() -> String {
    "blob".to_string()
}

fn default_org_dir() -> String {
    "org".to_string()
}

fn default_depth() -> usize {
    DEFAULT_SHARD_DEPTH
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store root; relative paths resolve against the working directory.
    /// `None` means the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default = "default_meta_dir")]
    pub meta_dir: String,

    #[serde(default = "default_blob_dir")]
    pub blob_dir: String,

    #[serde(default = "default_org_dir")]
    pub org_dir: String,

    /// Number of nested shard directories
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            meta_dir: default_meta_dir(),
            blob_dir: default_blob_dir(),
            org_dir: default_org_dir(),
            depth: default_depth(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.depth == 0 || self.depth > MAX_SHARD_DEPTH {
            return Err(ApiError::ConfigError(format!(
                "storage.depth must be between 1 and {}, got {}",
                MAX_SHARD_DEPTH, self.depth
            )));
        }
        for (name, dir) in [
            ("meta_dir", &self.meta_dir),
            ("blob_dir", &self.blob_dir),
            ("org_dir", &self.org_dir),
        ] {
            if dir.is_empty() {
                return Err(ApiError::ConfigError(format!("storage.{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Resolve the store root to an actual filesystem location.
    pub fn resolve_root(&self, base_dir: &Path) -> Result<PathBuf, ApiError> {
        match &self.root {
            Some(root) if root.is_absolute() => Ok(root.clone()),
            Some(root) => Ok(base_dir.join(root)),
            None => {
                let dirs = directories::ProjectDirs::from("", "ensorbi", "ensorbi").ok_or_else(|| {
                    ApiError::ConfigError(
                        "Could not determine platform data directory (HOME not set)".to_string(),
                    )
                })?;
                Ok(dirs.data_dir().join("storage"))
            }
        }
    }

    /// Directory layout handed to the filesystem persistence
    pub fn layout(&self, base_dir: &Path) -> Result<StorageLayout, ApiError> {
        let mut layout = StorageLayout::new(self.resolve_root(base_dir)?).with_depth(self.depth);
        layout.meta_dir = self.meta_dir.clone();
        layout.blob_dir = self.blob_dir.clone();
        layout.org_dir = self.org_dir.clone();
        Ok(layout)
    }
}
