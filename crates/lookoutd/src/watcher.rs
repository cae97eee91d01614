//! Classifier poll loop.
//!
//! Every cycle re-reads the whole event table, groups rows by identity,
//! collapses each group into visit steps, and acts on the verdict. The
//! loop is idempotent per cycle: partial visits simply come back around.

use chrono::{DateTime, Duration, Utc};
use lookout_core::visit::{classify, collapse, Observation, SuspiciousEntry, Verdict};
use lookout_store::{EventStore, LocationRecord};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Watcher tuning, derived from [`Config`](crate::config::Config).
pub struct WatcherConfig {
    pub poll_interval: std::time::Duration,
    pub proximity: Duration,
    pub anomalous_retention: Duration,
    pub audit_path: PathBuf,
}

pub struct Watcher<S> {
    store: S,
    config: WatcherConfig,
    suspicious: Vec<SuspiciousEntry>,
}

impl<S: EventStore> Watcher<S> {
    pub fn new(store: S, config: WatcherConfig) -> Self {
        Self {
            store,
            config,
            suspicious: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Suspicious visits recorded so far, oldest first.
    pub fn suspicious(&self) -> &[SuspiciousEntry] {
        &self.suspicious
    }

    /// Poll the store on the configured cadence, forever.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            ticker.tick().await;
            self.run_cycle(Utc::now()).await;
        }
    }

    /// One classification pass over everything currently in the store.
    ///
    /// Store failures are logged and absorbed; the next cycle retries.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) {
        let rows = match self.store.select_all().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "event fetch failed; retrying next cycle");
                return;
            }
        };
        tracing::debug!(rows = rows.len(), "poll cycle");

        for (label, observations) in group_by_identity(rows) {
            let steps = collapse(&observations, self.config.proximity);
            match classify(&steps) {
                Verdict::Pending => {
                    tracing::debug!(identity = %label, steps = steps.len(), "visit in progress");
                }
                Verdict::Legitimate => {
                    if self.delete(&label).await {
                        tracing::info!(identity = %label, "legitimate visit: entered, checked out, left");
                    }
                }
                Verdict::Suspicious {
                    first_seen,
                    last_seen,
                } => {
                    // Record only after the delete lands, so a store hiccup
                    // cannot double-count the visit on the retry cycle.
                    if self.delete(&label).await {
                        tracing::warn!(
                            identity = %label,
                            %first_seen,
                            %last_seen,
                            "suspicious visit: left without a checkout"
                        );
                        self.suspicious.push(SuspiciousEntry {
                            label,
                            first_seen,
                            last_seen,
                        });
                    }
                }
                Verdict::Anomalous => {
                    self.handle_anomalous(&label, &observations, now).await;
                }
            }
        }
    }

    /// Anomalous visits have no safe deletion rule, so their events are
    /// retained for review until they go stale.
    async fn handle_anomalous(
        &mut self,
        label: &str,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) {
        // classify() only yields Anomalous for a non-empty sequence.
        let Some(newest) = observations.last().map(|o| o.timestamp) else {
            return;
        };
        if now - newest > self.config.anomalous_retention {
            if self.delete(label).await {
                tracing::warn!(
                    identity = %label,
                    last_event = %newest,
                    "anomalous visit evicted after retention window"
                );
            }
        } else {
            tracing::error!(
                identity = %label,
                "seen in store without an entry event; retaining for review"
            );
        }
    }

    async fn delete(&mut self, label: &str) -> bool {
        match self.store.delete_where(label).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(identity = %label, error = %err, "event delete failed; retrying next cycle");
                false
            }
        }
    }

    /// Log every recorded suspicious visit and write the audit file.
    pub fn flush_audit(&self) {
        if self.suspicious.is_empty() {
            tracing::info!("no suspicious visits recorded");
            return;
        }
        for entry in &self.suspicious {
            tracing::warn!(
                identity = %entry.label,
                first_seen = %entry.first_seen,
                last_seen = %entry.last_seen,
                "suspicious visit"
            );
        }
        match serde_json::to_vec_pretty(&self.suspicious) {
            Ok(json) => {
                let path = &self.config.audit_path;
                let write = path
                    .parent()
                    .map_or(Ok(()), std::fs::create_dir_all)
                    .and_then(|()| std::fs::write(path, json));
                match write {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), count = self.suspicious.len(), "audit list written")
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed to write audit list")
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize audit list"),
        }
    }
}

/// Group rows by identity, each group ordered by timestamp ascending.
fn group_by_identity(rows: Vec<LocationRecord>) -> BTreeMap<String, Vec<Observation>> {
    let mut grouped: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.id).or_default().push(Observation {
            location: row.location,
            timestamp: row.timestamp,
        });
    }
    for observations in grouped.values_mut() {
        observations.sort_by_key(|o| o.timestamp);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lookout_core::Location::{Checkout, EntranceExit};
    use lookout_store::MemoryEventStore;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn watcher() -> Watcher<MemoryEventStore> {
        let dir = std::env::temp_dir().join("lookoutd-tests");
        Watcher::new(
            MemoryEventStore::new(),
            WatcherConfig {
                poll_interval: std::time::Duration::from_secs(5),
                proximity: Duration::seconds(15),
                anomalous_retention: Duration::seconds(600),
                audit_path: dir.join("suspicious.json"),
            },
        )
    }

    #[tokio::test]
    async fn test_legitimate_visit_is_deleted() {
        let mut w = watcher();
        w.store().insert_at("person1", EntranceExit, t(0));
        w.store().insert_at("person1", Checkout, t(5));
        w.store().insert_at("person1", EntranceExit, t(20));

        w.run_cycle(t(30)).await;

        assert!(w.store().is_empty());
        assert!(w.suspicious().is_empty());
    }

    #[tokio::test]
    async fn test_suspicious_visit_is_audited_and_deleted() {
        let mut w = watcher();
        w.store().insert_at("person2", EntranceExit, t(0));
        w.store().insert_at("person2", EntranceExit, t(20));

        w.run_cycle(t(30)).await;

        assert!(w.store().is_empty());
        assert_eq!(
            w.suspicious(),
            &[SuspiciousEntry {
                label: "person2".into(),
                first_seen: t(0),
                last_seen: t(20),
            }]
        );
    }

    #[tokio::test]
    async fn test_entrance_burst_collapses_to_pending() {
        let mut w = watcher();
        // Two samples 3s apart: one physical presence at the entrance.
        w.store().insert_at("person3", EntranceExit, t(0));
        w.store().insert_at("person3", EntranceExit, t(3));

        w.run_cycle(t(10)).await;

        assert_eq!(w.store().len(), 2, "pending events must be retained");
        assert!(w.suspicious().is_empty());
    }

    #[tokio::test]
    async fn test_anomalous_visit_is_retained() {
        let mut w = watcher();
        w.store().insert_at("ghost", Checkout, t(0));

        w.run_cycle(t(30)).await;

        assert_eq!(w.store().len(), 1);
        assert!(w.suspicious().is_empty());
    }

    #[tokio::test]
    async fn test_anomalous_visit_evicted_after_retention() {
        let mut w = watcher();
        w.store().insert_at("ghost", Checkout, t(0));

        w.run_cycle(t(700)).await;

        assert!(w.store().is_empty());
        assert!(w.suspicious().is_empty(), "eviction is not a suspicion record");
    }

    #[tokio::test]
    async fn test_identities_are_classified_independently() {
        let mut w = watcher();
        w.store().insert_at("person1", EntranceExit, t(0));
        w.store().insert_at("person1", Checkout, t(5));
        w.store().insert_at("person1", EntranceExit, t(20));
        w.store().insert_at("person4", EntranceExit, t(1));

        w.run_cycle(t(30)).await;

        // person1 resolved and deleted; person4 still pending.
        let rows = w.store().select_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "person4");
    }

    #[tokio::test]
    async fn test_unordered_rows_are_sorted_before_collapsing() {
        let mut w = watcher();
        // Store returns rows in insertion order; insert out of time order.
        w.store().insert_at("person5", EntranceExit, t(20));
        w.store().insert_at("person5", Checkout, t(5));
        w.store().insert_at("person5", EntranceExit, t(0));

        w.run_cycle(t(30)).await;

        assert!(w.store().is_empty(), "sorted sequence is legitimate");
    }

    #[tokio::test]
    async fn test_repeated_cycles_are_idempotent_for_pending() {
        let mut w = watcher();
        w.store().insert_at("person6", EntranceExit, t(0));

        for cycle in 1..=3 {
            w.run_cycle(t(cycle * 5)).await;
            assert_eq!(w.store().len(), 1);
        }
        assert!(w.suspicious().is_empty());
    }

    #[tokio::test]
    async fn test_flush_audit_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let audit_path = dir.path().join("suspicious.json");
        let mut w = Watcher::new(
            MemoryEventStore::new(),
            WatcherConfig {
                poll_interval: std::time::Duration::from_secs(5),
                proximity: Duration::seconds(15),
                anomalous_retention: Duration::seconds(600),
                audit_path: audit_path.clone(),
            },
        );
        w.store().insert_at("person2", EntranceExit, t(0));
        w.store().insert_at("person2", EntranceExit, t(20));
        w.run_cycle(t(30)).await;

        w.flush_audit();

        let json = std::fs::read_to_string(&audit_path).unwrap();
        let entries: Vec<SuspiciousEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(entries, w.suspicious());
    }
}
