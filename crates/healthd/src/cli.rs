//! Command-line interface

use clap::Parser;
use health_common::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "service-health-checker")]
#[command(
    about = "Service Health Checker - probes services and restarts them within an hourly budget",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Run once and exit
    #[arg(long)]
    pub once: bool,

    /// Run in daemon mode (same as the default loop)
    #[arg(long)]
    pub daemon: bool,

    /// Override check interval (seconds)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Do not restart services
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Show status and exit
    #[arg(long)]
    pub status: bool,

    /// Manually restart a service
    #[arg(long, value_name = "NAME")]
    pub restart: Option<String>,
}

/// What a single invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Restart(String),
    Status,
    Once,
    Loop,
}

impl Cli {
    /// `--restart` wins over `--status`, which wins over the loop modes
    pub fn command(&self) -> Command {
        if let Some(name) = &self.restart {
            Command::Restart(name.clone())
        } else if self.status {
            Command::Status
        } else if self.once {
            Command::Once
        } else {
            Command::Loop
        }
    }
}
