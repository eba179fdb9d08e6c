//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::AppConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment.
    pub fn load(base_dir: &Path) -> Result<AppConfig, ApiError> {
        MergeService::load(base_dir)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ApiError> {
        MergeService::load_from_file(path)
    }

    /// Explicit file when given, layered lookup otherwise.
    pub fn resolve(base_dir: &Path, explicit: Option<&Path>) -> Result<AppConfig, ApiError> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => Self::load(base_dir),
        }
    }
}
