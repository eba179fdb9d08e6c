//! TOML file sources: global, working directory, explicit path.

use crate::config::CONFIG_FILE_NAME;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::{Path, PathBuf};

/// `<platform config dir>/ensorbi.toml`
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "ensorbi", "ensorbi")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Global config, skipped when absent.
pub fn add_global(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) => add_optional(builder, &path),
        None => builder,
    }
}

/// `ensorbi.toml` in `base_dir`, skipped when absent.
pub fn add_local(builder: ConfigBuilder<DefaultState>, base_dir: &Path) -> ConfigBuilder<DefaultState> {
    add_optional(builder, &base_dir.join(CONFIG_FILE_NAME))
}

/// A file the user named explicitly; missing is an error.
pub fn add_required(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
}

fn add_optional(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
}
