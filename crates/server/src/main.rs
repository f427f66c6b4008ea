mod bootstrap;
mod commands;
mod health;
mod scheduler;

use std::sync::Arc;

use anyhow::Result;
use encore_core::config::{AppConfig, LoadOptions};
use encore_discord::commands::CommandRouter;
use encore_discord::gateway::{GatewayRunner, NoopGatewayTransport, ReconnectPolicy};

use crate::commands::{ConcertHandlers, GameHandlers};
use crate::scheduler::DigestScheduler;

fn init_logging(config: &AppConfig) {
    use encore_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        Arc::clone(&app.mapping),
    )
    .await?;

    let chunk_len = app.config.digest.max_chunk_len;
    let data_dir = app.config.storage.data_dir.clone();

    let scheduler = Arc::new(DigestScheduler::new(
        Arc::clone(&app.mapping),
        Arc::clone(&app.messenger),
        app.config.digest.channel.clone(),
        data_dir.clone(),
        chunk_len,
    ));
    let scheduler_task = Arc::clone(&scheduler).spawn(app.config.digest.interval_hours);

    let router = CommandRouter::new(
        ConcertHandlers::new(Arc::clone(&app.mapping), data_dir, chunk_len),
        GameHandlers::new(Arc::clone(&app.catalog), chunk_len),
    );
    let runner = GatewayRunner::new(
        Arc::new(NoopGatewayTransport),
        router,
        Arc::clone(&app.messenger),
        app.config.discord.command_prefix.clone(),
        ReconnectPolicy::default(),
    );
    runner.start().await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        digest_channel = %app.config.digest.channel,
        digest_interval_hours = app.config.digest.interval_hours,
        "encore-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "encore-server stopping"
    );
    scheduler_task.abort();

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
