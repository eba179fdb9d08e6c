//! Environment variable source: ENSORBI__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// `ENSORBI__STORAGE__DEPTH=4` sets `storage.depth`
pub fn environment() -> Environment {
    Environment::with_prefix("ENSORBI")
        .separator("__")
        .try_parsing(true)
}

/// Add environment variable overlay to builder.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(environment())
}
