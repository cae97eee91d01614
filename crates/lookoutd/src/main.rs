use anyhow::{Context, Result};
use chrono::Duration;
use lookout_store::{EventStore, RestEventStore};
use tracing_subscriber::EnvFilter;

mod config;
mod watcher;

use watcher::{Watcher, WatcherConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    tracing::info!(
        url = %config.store_url,
        table = %config.store_table,
        poll_interval_secs = config.poll_interval_secs,
        "lookoutd starting"
    );

    let store = RestEventStore::new(
        &config.store_url,
        &config.store_table,
        &config.store_key,
        std::time::Duration::from_secs(config.store_timeout_secs),
    )
    .context("failed to build event-store client")?;

    // Fail fast: an unreachable store at startup is fatal, a failing call
    // later is just a skipped cycle.
    let pending = store
        .select_all()
        .await
        .context("event store unreachable at startup")?;
    tracing::info!(rows = pending.len(), "event store reachable");

    let mut watcher = Watcher::new(
        store,
        WatcherConfig {
            poll_interval: std::time::Duration::from_secs(config.poll_interval_secs),
            proximity: Duration::seconds(config.proximity_secs),
            anomalous_retention: Duration::seconds(config.anomalous_retention_secs),
            audit_path: config.audit_path,
        },
    );

    tokio::select! {
        _ = watcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    watcher.flush_audit();
    tracing::info!("lookoutd stopped");
    Ok(())
}
