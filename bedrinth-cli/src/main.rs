//! Bedrinth - browse packages in the LeviLamina registry
//!
//! Main entry point: parses flags, sets up logging and configuration,
//! then hands off to the browse commands.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bedrinth_core::BedrinthConfig;

mod browse_cli;

use browse_cli::BrowseCommand;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "bedrinth",
    about = "Search and inspect packages in the LeviLamina registry",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: BrowseCommand,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Configuration file (defaults to the platform config directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Override the package index URL
    #[clap(long, global = true)]
    index_url: Option<String>,
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // stdout is reserved for command output
        .init();
}

fn load_config(path: Option<&PathBuf>, index_url: Option<String>) -> Result<BedrinthConfig> {
    let config = match path {
        Some(path) => BedrinthConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BedrinthConfig::load().context("Failed to load default config")?,
    };

    match index_url {
        Some(url) => config.with_index_url(url).context("Invalid --index-url"),
        None => Ok(config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    let config = load_config(cli.config.as_ref(), cli.index_url)?;
    tracing::debug!("Using package index {}", config.index_url);

    cli.command.execute(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bedrinth",
            "tags",
            "--log-level",
            "debug",
            "--index-url",
            "http://localhost:8080/index.json",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert_eq!(
            cli.index_url.as_deref(),
            Some("http://localhost:8080/index.json")
        );
    }
}
