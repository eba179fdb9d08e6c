//! Configuration
//!
//! Layered settings for the store location, the layout simulation and logging.
//! Sources are merged by [`merge::service::MergeService`]; callers go through
//! [`ConfigLoader`].

pub mod facade;
pub mod merge;
pub mod sources;
pub mod storage;

use crate::error::ApiError;
use crate::layout::{Bounds, LayoutParams};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

pub use facade::ConfigLoader;
pub use storage::StorageConfig;

/// File name looked up in the working directory and the platform config dir
pub const CONFIG_FILE_NAME: &str = "ensorbi.toml";

/// Hashes are 64 hex characters; deeper shards would run out of prefix
pub const MAX_SHARD_DEPTH: usize = 64;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        self.storage.validate()?;
        self.layout.validate()
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String, ApiError> {
        toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}

fn default_repulsion() -> f64 {
    600.0
}

fn default_spring() -> f64 {
    0.05
}

fn default_damping() -> f64 {
    0.7
}

fn default_canvas_width() -> f64 {
    800.0
}

fn default_canvas_height() -> f64 {
    600.0
}

/// Force layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_repulsion")]
    pub repulsion: f64,
    #[serde(default = "default_spring")]
    pub spring: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Reflect velocities at the canvas edges
    #[serde(default)]
    pub reflect_at_bounds: bool,
    /// Canvas used by the headless `scope` command
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: default_repulsion(),
            spring: default_spring(),
            damping: default_damping(),
            reflect_at_bounds: false,
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        let values = [
            ("repulsion", self.repulsion),
            ("spring", self.spring),
            ("damping", self.damping),
            ("canvas_width", self.canvas_width),
            ("canvas_height", self.canvas_height),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ApiError::ConfigError(format!(
                "layout.{} must be a finite non-negative number, got {}",
                name, value
            )));
        }
        if self.canvas_width == 0.0 || self.canvas_height == 0.0 {
            return Err(ApiError::ConfigError(
                "layout canvas dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> LayoutParams {
        LayoutParams {
            repulsion: self.repulsion,
            spring: self.spring,
            damping: self.damping,
            bounds: self.reflect_at_bounds.then_some(Bounds {
                width: self.canvas_width,
                height: self.canvas_height,
            }),
        }
    }
}
