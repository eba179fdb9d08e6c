//! Error types for storage and the API surface.

use crate::types::Hash;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by persistence and the node store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid node {hash}: {reason}")]
    InvalidNode { hash: Hash, reason: String },

    #[error("Empty payload for blob {0}")]
    EmptyPayload(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced to command and configuration callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Node not found: {0}")]
    NodeNotFound(Hash),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
