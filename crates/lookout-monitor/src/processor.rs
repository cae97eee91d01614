//! Per-frame identity resolution and event-emission gating.

use chrono::{DateTime, Duration, Utc};
use lookout_core::{DetectedFace, IdentityGallery, Location, Resolution};
use std::collections::HashMap;

/// Minimum gap between emitted events for one identity.
pub const DEFAULT_EMIT_COOLDOWN_SECS: i64 = 10;
/// Process every Nth frame.
pub const DEFAULT_FRAME_STRIDE: u32 = 2;

/// Matcher-side tuning.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Camera placement this monitor instance reports events for.
    pub location: Location,
    /// Only every Nth frame is resolved; the rest are dropped so the
    /// matcher keeps up with the feed.
    pub frame_stride: u32,
    /// Suppress re-emission for an identity seen again within this window,
    /// keeping identity turnover below the classifier's poll cadence.
    pub emit_cooldown: Duration,
}

impl MonitorConfig {
    pub fn for_location(location: Location) -> Self {
        Self {
            location,
            frame_stride: DEFAULT_FRAME_STRIDE,
            emit_cooldown: Duration::seconds(DEFAULT_EMIT_COOLDOWN_SECS),
        }
    }
}

/// Outcome for one face on a processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    /// Index into the frame's detected-face slice.
    pub face_index: usize,
    pub label: String,
    pub location: Location,
    pub newly_enrolled: bool,
    /// The stored representative crop should be rewritten from this
    /// observation (confident match or fresh enrollment).
    pub refresh_crop: bool,
    /// False when the cooldown window suppressed the store write.
    pub emit: bool,
}

/// Resolves every face on sampled frames and decides which observations
/// become store events.
///
/// Owns the gallery: the monitor is the only writer, per the one-way data
/// flow toward the classifier.
pub struct FrameProcessor {
    gallery: IdentityGallery,
    config: MonitorConfig,
    frames_seen: u64,
    last_emitted: HashMap<String, DateTime<Utc>>,
}

impl FrameProcessor {
    pub fn new(gallery: IdentityGallery, config: MonitorConfig) -> Self {
        Self {
            gallery,
            config,
            frames_seen: 0,
            last_emitted: HashMap::new(),
        }
    }

    pub fn gallery(&self) -> &IdentityGallery {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut IdentityGallery {
        &mut self.gallery
    }

    /// Resolve a frame's faces. Off-stride frames return an empty batch;
    /// so does a frame with no detected faces.
    pub fn process_frame(&mut self, faces: &[DetectedFace], now: DateTime<Utc>) -> Vec<Sighting> {
        let stride = u64::from(self.config.frame_stride.max(1));
        let sampled = self.frames_seen % stride == 0;
        self.frames_seen += 1;
        if !sampled {
            return Vec::new();
        }

        let mut sightings = Vec::with_capacity(faces.len());
        for (face_index, face) in faces.iter().enumerate() {
            let resolution = self.gallery.resolve(&face.embedding, now);
            let (newly_enrolled, refresh_crop) = match &resolution {
                Resolution::Matched { label, distance } => {
                    tracing::debug!(identity = %label, distance, "face matched");
                    (false, true)
                }
                Resolution::Deduplicated { label, distance } => {
                    tracing::debug!(identity = %label, distance, "near-duplicate unknown reused");
                    (false, false)
                }
                Resolution::Enrolled { label } => {
                    tracing::info!(identity = %label, "unrecognized face enrolled");
                    (true, true)
                }
            };
            let label = resolution.label().to_string();
            let emit = self.cooldown_elapsed(&label, now);
            if emit {
                self.last_emitted.insert(label.clone(), now);
            } else {
                tracing::trace!(identity = %label, "emission suppressed by cooldown");
            }
            sightings.push(Sighting {
                face_index,
                label,
                location: self.config.location,
                newly_enrolled,
                refresh_crop,
                emit,
            });
        }
        sightings
    }

    fn cooldown_elapsed(&self, label: &str, now: DateTime<Utc>) -> bool {
        match self.last_emitted.get(label) {
            Some(last) => now - *last >= self.config.emit_cooldown,
            None => true,
        }
    }
}
