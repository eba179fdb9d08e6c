//! MergeService: orchestrates sources, deserializes and validates AppConfig.

use crate::config::sources::{environment, file};
use crate::config::AppConfig;
use crate::error::ApiError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> `base_dir/ensorbi.toml` -> environment (highest).
    pub fn load(base_dir: &Path) -> Result<AppConfig, ApiError> {
        let builder = file::add_global(Config::builder());
        let builder = file::add_local(builder, base_dir);
        Self::finish(environment::add_to_builder(builder))
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ApiError> {
        let builder = file::add_required(Config::builder(), path);
        Self::finish(environment::add_to_builder(builder))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ApiError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
