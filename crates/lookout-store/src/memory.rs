//! In-process event store for tests and single-machine runs.

use crate::{EventStore, LocationRecord, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lookout_core::Location;
use std::sync::Mutex;

/// [`EventStore`] kept in a `Mutex<Vec<_>>`, mirroring the remote table's
/// semantics: append-only inserts with store-assigned timestamps, full
/// reads, per-identity deletes.
#[derive(Default)]
pub struct MemoryEventStore {
    rows: Mutex<Vec<LocationRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit timestamp. Test seam; the trait method
    /// stamps rows with the current time like the remote store does.
    pub fn insert_at(&self, label: &str, location: Location, timestamp: DateTime<Utc>) {
        self.lock_rows().push(LocationRecord {
            id: label.to_string(),
            location,
            timestamp,
        });
    }

    pub fn len(&self) -> usize {
        self.lock_rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_rows().is_empty()
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<LocationRecord>> {
        // A poisoned lock only means another test thread panicked mid-push;
        // the rows themselves are still usable.
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, label: &str, location: Location) -> Result<(), StoreError> {
        self.insert_at(label, location, Utc::now());
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        Ok(self.lock_rows().clone())
    }

    async fn delete_where(&self, label: &str) -> Result<(), StoreError> {
        self.lock_rows().retain(|row| row.id != label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn test_insert_then_select() {
        let store = MemoryEventStore::new();
        store
            .insert("person1", Location::EntranceExit)
            .await
            .unwrap();
        let rows = store.select_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "person1");
        assert_eq!(rows[0].location, Location::EntranceExit);
    }

    #[tokio::test]
    async fn test_delete_targets_one_identity() {
        let store = MemoryEventStore::new();
        store.insert_at("person1", Location::EntranceExit, t(0));
        store.insert_at("person2", Location::EntranceExit, t(1));
        store.insert_at("person1", Location::Checkout, t(2));

        store.delete_where("person1").await.unwrap();

        let rows = store.select_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "person2");
    }

    #[tokio::test]
    async fn test_delete_missing_identity_is_a_noop() {
        let store = MemoryEventStore::new();
        store.insert_at("person1", Location::EntranceExit, t(0));
        store.delete_where("nobody").await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
