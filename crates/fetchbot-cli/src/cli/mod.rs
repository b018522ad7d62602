//! CLI for the fetchbot download engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fetchbot_core::config::{self, FetchbotConfig};
use std::path::PathBuf;
use std::time::Duration;

use commands::{run_config, run_get, GetArgs};

/// Top-level CLI for fetchbot.
#[derive(Debug, Parser)]
#[command(name = "fetchbot")]
#[command(about = "fetchbot: threaded downloads with progress notifications", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the XDG location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs concurrently, printing a line per report.
    Get {
        /// Direct HTTP/HTTPS URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Save into this directory (default: destination_directory from config).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// File name to save as (single URL only; default: last URL path segment).
        #[arg(long, short = 'o', value_name = "NAME")]
        name: Option<String>,

        /// Cancel downloads still running after this many seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show the config file location and the effective configuration.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<FetchbotConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    /// Returns `Ok(false)` when the command ran but some download failed.
    pub fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_ref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                dir,
                name,
                timeout,
            } => {
                let args = GetArgs {
                    dir: dir.unwrap_or_else(|| cfg.destination_directory.clone()),
                    name,
                    timeout: timeout.map(Duration::from_secs),
                };
                let failures = run_get(&cfg, &urls, &args)?;
                Ok(failures == 0)
            }
            CliCommand::Config => {
                run_config(cli.config.as_deref(), &cfg)?;
                Ok(true)
            }
        }
    }
}
