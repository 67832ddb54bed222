//! Service Health Checker - probes declared services and restarts the
//! unhealthy ones within an hourly budget.

use anyhow::Result;
use clap::Parser;
use healthd::cli::{Cli, Command};
use healthd::{app, logging, shutdown, Systemctl};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = app::load_config(&cli)?;
    logging::init(&config.logging, cli.verbose)?;

    info!("Service Health Checker v{} starting", env!("CARGO_PKG_VERSION"));

    let token = CancellationToken::new();
    if matches!(cli.command(), Command::Once | Command::Loop) {
        shutdown::spawn_signal_listener(token.clone());
    }

    let result = app::execute(&cli, &config, Arc::new(Systemctl::new()), token.clone()).await;
    token.cancel();
    result
}
