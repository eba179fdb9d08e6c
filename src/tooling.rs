//! Tooling Layer
//!
//! Command-line surface over the node store and headless scope layout.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
