use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

mod api;
mod config;
mod logging;
mod server;
mod web;

use config::ProjectConfig;
use logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "tapmon",
    about = "Live dashboard for tap-trainer session files",
    version,
    author
)]
struct Cli {
    /// Directory to watch for producer CSV files (default: ./samples)
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// HTTP listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Working directory containing tapmon.toml (default: current directory)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Open the dashboard in a browser after startup
    #[arg(long)]
    open: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Log level (overridden by RUST_LOG when set)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level, cli.log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let mut config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    // CLI flags win over the config file.
    if let Some(dir) = cli.dir {
        config.samples_dir = dir;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Relative paths in the config resolve against the working directory.
    if config.samples_dir.is_relative() {
        config.samples_dir = working_dir.join(&config.samples_dir);
    }
    if config.names_file.is_relative() {
        config.names_file = working_dir.join(&config.names_file);
    }
    if let Some(dir) = &config.artifacts_dir {
        if dir.is_relative() {
            config.artifacts_dir = Some(working_dir.join(dir));
        }
    }

    server::run(config, cli.open).await
}
