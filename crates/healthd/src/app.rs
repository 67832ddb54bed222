//! Wiring between the CLI, the config and the orchestrator

use crate::cli::{Cli, Command};
use crate::orchestrator::{Orchestrator, RunMode};
use crate::probe::http_client;
use crate::report::render_status_table;
use crate::supervisor::ServiceManager;
use anyhow::{Context, Result};
use health_common::config::resolve_config_path;
use health_common::Config;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Locate and load the config named on the command line
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = resolve_config_path(&cli.config);
    Ok(Config::load_from_path(&path)?)
}

/// Effective sweep interval: the CLI override, else the config value
pub fn effective_interval(cli: &Cli, config: &Config) -> Duration {
    Duration::from_secs(cli.interval.unwrap_or(config.interval_seconds))
}

/// Build the orchestrator from config
pub fn build_orchestrator(
    cli: &Cli,
    config: &Config,
    manager: Arc<dyn ServiceManager>,
) -> Result<Orchestrator> {
    let set = config.resolve_services();
    if !set.rejected.is_empty() {
        info!(
            loaded = set.services.len(),
            skipped = set.rejected.len(),
            "Some service entries were skipped"
        );
    }

    let http = http_client().context("Failed to build HTTP client")?;
    Ok(Orchestrator::new(set.services, manager, http).with_dry_run(cli.dry_run))
}

/// Run the command selected on the command line
pub async fn execute(
    cli: &Cli,
    config: &Config,
    manager: Arc<dyn ServiceManager>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut orchestrator = build_orchestrator(cli, config, manager)?;

    match cli.command() {
        Command::Restart(name) => {
            // A missing service is logged by the orchestrator and is not a
            // process failure
            if let Err(e) = orchestrator.manual_restart(&name).await {
                debug!("Manual restart skipped: {}", e);
            }
        }
        Command::Status => {
            let reports = orchestrator.status().await;
            print!("{}", render_status_table(&reports, io::stdout().is_terminal()));
        }
        Command::Once => {
            orchestrator
                .run(RunMode::Once, effective_interval(cli, config), &shutdown)
                .await;
        }
        Command::Loop => {
            orchestrator
                .run(RunMode::Forever, effective_interval(cli, config), &shutdown)
                .await;
        }
    }

    Ok(())
}
