use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lookout_core::Location;
use lookout_store::{EventStore, RestEventStore};

#[derive(Parser)]
#[command(name = "lookout", about = "Lookout store-monitoring CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a scripted legitimate and suspicious customer for an
    /// end-to-end check against a running watcher
    Seed,
    /// Dump the pending location events
    Events,
    /// Delete one identity's pending events
    Purge {
        /// Identity label to purge
        label: String,
    },
    /// Check that the event store is reachable
    Status,
}

/// Build the store client from the same `LOOKOUT_*` variables lookoutd
/// reads, so both talk to the same table.
fn store_from_env() -> Result<RestEventStore> {
    let url = std::env::var("LOOKOUT_STORE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    let key = std::env::var("LOOKOUT_STORE_KEY").unwrap_or_default();
    let table =
        std::env::var("LOOKOUT_STORE_TABLE").unwrap_or_else(|_| "security_system".to_string());
    RestEventStore::new(&url, &table, &key, std::time::Duration::from_secs(10))
        .context("failed to build event-store client")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = store_from_env()?;

    match cli.command {
        Commands::Seed => seed(&store).await?,
        Commands::Events => {
            let mut rows = store
                .select_all()
                .await
                .context("failed to fetch events")?;
            rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            if rows.is_empty() {
                println!("No pending events");
            }
            for row in rows {
                println!("{}  {:<14} {}", row.timestamp, row.location, row.id);
            }
        }
        Commands::Purge { label } => {
            store
                .delete_where(&label)
                .await
                .with_context(|| format!("failed to purge events for {label}"))?;
            println!("Purged events for {label}");
        }
        Commands::Status => {
            let rows = store
                .select_all()
                .await
                .context("event store unreachable")?;
            println!("Event store reachable; {} pending event(s)", rows.len());
        }
    }

    Ok(())
}

/// Replay the classic test scenario: person1 enters, checks out, and
/// leaves; person2 enters and leaves without checking out. A running
/// watcher should report one legitimate and one suspicious visit.
async fn seed(store: &RestEventStore) -> Result<()> {
    for label in ["person1", "person2"] {
        store
            .delete_where(label)
            .await
            .with_context(|| format!("failed to clear leftover events for {label}"))?;
    }

    for location in [
        Location::EntranceExit,
        Location::EntranceExit,
        Location::Checkout,
        Location::Checkout,
        Location::EntranceExit,
        Location::EntranceExit,
    ] {
        store.insert("person1", location).await?;
    }

    store.insert("person2", Location::EntranceExit).await?;
    store.insert("person2", Location::EntranceExit).await?;
    println!("Waiting out the proximity window so person2's exit forms a second step...");
    tokio::time::sleep(std::time::Duration::from_secs(16)).await;
    store.insert("person2", Location::EntranceExit).await?;
    store.insert("person2", Location::EntranceExit).await?;

    println!("Inserted test customers person1 (legitimate) and person2 (suspicious)");
    Ok(())
}
