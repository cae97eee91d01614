//! lookout-store — the event store both halves of the pipeline share.
//!
//! The monitor appends location events; the watcher reads them all and
//! deletes per identity once a visit reaches a terminal verdict. The store
//! is the only shared mutable resource: no locks, no transactions, just
//! read-then-conditional-delete against its own consistency guarantees.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lookout_core::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryEventStore;
pub use rest::RestEventStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected request: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One persisted location event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Identity label the event belongs to.
    pub id: String,
    pub location: Location,
    /// Assigned by the store at insertion time.
    pub timestamp: DateTime<Utc>,
}

/// Table-like remote service the monitor and watcher communicate through.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event; the store assigns the timestamp.
    async fn insert(&self, label: &str, location: Location) -> Result<(), StoreError>;

    /// Every pending event, in no guaranteed order.
    async fn select_all(&self) -> Result<Vec<LocationRecord>, StoreError>;

    /// Delete exactly the given identity's rows, nothing broader.
    async fn delete_where(&self, label: &str) -> Result<(), StoreError>;
}
