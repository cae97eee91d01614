//! Identity gallery: matching a probe embedding against known and
//! previously-enrolled faces, enrolling new identities on demand.

use crate::types::Embedding;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

/// Maximum distance at which a probe resolves to an existing identity.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.45;
/// Stricter bound checked against enrolled unknowns only, so one unmatched
/// person seen moments apart does not enroll twice.
pub const DEFAULT_DEDUP_THRESHOLD: f32 = 0.48;

const UNKNOWN_PREFIX: &str = "unknown_";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("duplicate identity label: {0}")]
    DuplicateLabel(String),
}

/// One resolved person: a pre-provisioned name or a generated `unknown_<n>`.
///
/// The label is immutable once assigned; the gallery never deletes entries,
/// so recognized faces keep matching on return visits.
#[derive(Debug, Clone)]
pub struct FaceIdentity {
    pub label: String,
    pub embedding: Embedding,
    /// Audit only; matching never consults this.
    pub enrolled_at: DateTime<Utc>,
}

impl FaceIdentity {
    pub fn is_unknown(&self) -> bool {
        parse_unknown_index(&self.label).is_some()
    }
}

/// Parse the `<n>` out of an `unknown_<n>` label.
pub fn parse_unknown_index(label: &str) -> Option<u32> {
    let digits = label.strip_prefix(UNKNOWN_PREFIX)?;
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// How a probe embedding was resolved to a label.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Best gallery entry fell within the match threshold.
    Matched { label: String, distance: f32 },
    /// No match, but an enrolled unknown sat within the dedup threshold.
    Deduplicated { label: String, distance: f32 },
    /// Nothing close enough; a new identity was enrolled.
    Enrolled { label: String },
}

impl Resolution {
    pub fn label(&self) -> &str {
        match self {
            Resolution::Matched { label, .. }
            | Resolution::Deduplicated { label, .. }
            | Resolution::Enrolled { label } => label,
        }
    }
}

/// Append/update-only store of resolved identities.
///
/// The matcher owns write access; readers take a [`snapshot`](Self::snapshot).
/// Insertion order is preserved so best-match ties break deterministically
/// toward the earliest entry.
pub struct IdentityGallery {
    entries: Vec<FaceIdentity>,
    /// Labels seen on disk at bootstrap but not re-embedded; they only
    /// block the unknown counter from re-issuing an index.
    reserved: BTreeSet<String>,
    match_threshold: f32,
    dedup_threshold: f32,
}

impl IdentityGallery {
    pub fn new(match_threshold: f32, dedup_threshold: f32) -> Self {
        Self {
            entries: Vec::new(),
            reserved: BTreeSet::new(),
            match_threshold,
            dedup_threshold,
        }
    }

    pub fn with_default_thresholds() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DEFAULT_DEDUP_THRESHOLD)
    }

    /// Register a pre-provisioned identity (a named person, or an unknown
    /// re-embedded from a persisted crop at startup). A reserved label may
    /// be registered once; a live entry's label may not.
    pub fn register(
        &mut self,
        label: impl Into<String>,
        embedding: Embedding,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), GalleryError> {
        let label = label.into();
        if self.entries.iter().any(|e| e.label == label) {
            return Err(GalleryError::DuplicateLabel(label));
        }
        self.reserved.remove(&label);
        self.entries.push(FaceIdentity {
            label,
            embedding,
            enrolled_at,
        });
        Ok(())
    }

    /// Mark a label as in use without an embedding, so `unknown_<n>`
    /// allocation skips its index.
    pub fn reserve_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.contains_label(&label) {
            self.reserved.insert(label);
        }
    }

    /// Resolve a probe embedding to a stable label, enrolling if needed.
    ///
    /// Ties on best distance break toward the earliest gallery entry, so a
    /// fixed gallery always resolves a given probe the same way.
    pub fn resolve(&mut self, probe: &Embedding, now: DateTime<Utc>) -> Resolution {
        if let Some((idx, distance)) = self.nearest(probe, |_| true) {
            if distance < self.match_threshold {
                return Resolution::Matched {
                    label: self.entries[idx].label.clone(),
                    distance,
                };
            }
        }

        // The dedup bound is checked against the enrolled-unknown subset
        // only: "same known person" and "already enrolled this unknown a
        // moment ago" are different precision/recall trade-offs.
        if let Some((idx, distance)) = self.nearest(probe, FaceIdentity::is_unknown) {
            if distance < self.dedup_threshold {
                return Resolution::Deduplicated {
                    label: self.entries[idx].label.clone(),
                    distance,
                };
            }
        }

        let label = self.next_unknown_label();
        tracing::debug!(identity = %label, "enrolled new identity");
        self.entries.push(FaceIdentity {
            label: label.clone(),
            embedding: probe.clone(),
            enrolled_at: now,
        });
        Resolution::Enrolled { label }
    }

    /// Read-only view of the gallery in insertion order.
    pub fn snapshot(&self) -> &[FaceIdentity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains_label(&self, label: &str) -> bool {
        self.reserved.contains(label) || self.entries.iter().any(|e| e.label == label)
    }

    /// Nearest entry passing `filter`, by distance, earliest entry winning
    /// ties. `None` when no entry passes.
    fn nearest(
        &self,
        probe: &Embedding,
        filter: impl Fn(&FaceIdentity) -> bool,
    ) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, identity) in self.entries.iter().enumerate() {
            if !filter(identity) {
                continue;
            }
            let distance = probe.distance(&identity.embedding);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }
        best
    }

    /// Smallest positive `n` with `unknown_<n>` unused across live entries
    /// and reserved bootstrap labels. Recomputed per enrollment rather than
    /// counted, so restarts never collide with persisted labels.
    fn next_unknown_label(&self) -> String {
        let used: BTreeSet<u32> = self
            .entries
            .iter()
            .map(|e| e.label.as_str())
            .chain(self.reserved.iter().map(String::as_str))
            .filter_map(parse_unknown_index)
            .collect();
        let mut n = 1;
        while used.contains(&n) {
            n += 1;
        }
        format!("{UNKNOWN_PREFIX}{n}")
    }
}
