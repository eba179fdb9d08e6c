//! Ensorbi CLI Binary
//!
//! Command-line interface for the personal knowledge graph.

use anyhow::Context;
use clap::Parser;
use ensorbi::config::ConfigLoader;
use ensorbi::logging::init_logging;
use ensorbi::tooling::cli::{write_default_config, Cli, CliContext, Commands};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    // Must work even when the existing configuration is broken
    if let Commands::InitConfig { path, force } = &cli.command {
        let target = path
            .clone()
            .unwrap_or_else(|| cli.base_dir.join(ensorbi::config::CONFIG_FILE_NAME));
        return Ok(write_default_config(&target, *force)?);
    }

    let mut config = ConfigLoader::resolve(&cli.base_dir, cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    init_logging(Some(&config.logging)).context("Failed to initialize logging")?;

    let context =
        CliContext::from_config(&cli.base_dir, config).context("Failed to open the store")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
