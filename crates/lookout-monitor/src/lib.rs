//! lookout-monitor — the camera-side half of the pipeline.
//!
//! Resolves each detected face to a stable identity label and emits
//! location events into the shared store. Frame capture and embedding
//! extraction are external; see [`vision`] for the boundary traits.

pub mod crops;
pub mod processor;
pub mod vision;

pub use crops::{bootstrap_gallery, save_crop, scan_unknown_labels, CropError};
pub use processor::{FrameProcessor, MonitorConfig, Sighting};
pub use vision::{FaceVision, FrameFeed, VisionError};

use lookout_store::EventStore;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Drive the monitor until the frame feed ends.
///
/// Store failures are logged and implicitly retried on later frames; crop
/// failures are logged and skipped. A feed or detection failure terminates
/// the loop — mid-stream acquisition loss is not recoverable here.
pub async fn run_monitor<F, V, S>(
    feed: &mut F,
    vision: &mut V,
    store: &S,
    processor: &mut FrameProcessor,
    crops_dir: Option<&Path>,
) -> Result<(), MonitorError>
where
    F: FrameFeed,
    V: FaceVision,
    S: EventStore + ?Sized,
{
    while let Some(frame) = feed.next_frame()? {
        let faces = vision.detect(&frame)?;
        let now = chrono::Utc::now();
        for sighting in processor.process_frame(&faces, now) {
            if sighting.refresh_crop {
                if let Some(dir) = crops_dir {
                    let bbox = &faces[sighting.face_index].bbox;
                    if let Err(err) = crops::save_crop(&frame, bbox, dir, &sighting.label) {
                        tracing::warn!(
                            identity = %sighting.label,
                            error = %err,
                            "failed to write face crop"
                        );
                    }
                }
            }
            if sighting.emit {
                if let Err(err) = store.insert(&sighting.label, sighting.location).await {
                    tracing::warn!(
                        identity = %sighting.label,
                        error = %err,
                        "event insert failed; will retry on a later sighting"
                    );
                }
            }
        }
    }
    tracing::info!("frame feed ended");
    Ok(())
}
