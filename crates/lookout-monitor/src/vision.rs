//! External vision-provider boundary.
//!
//! Frame acquisition and face embedding run outside this workspace; the
//! monitor consumes frames and `(bounding box, embedding)` pairs through
//! these traits and nothing else.

use image::RgbImage;
use lookout_core::DetectedFace;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("stream unreachable: {0}")]
    StreamUnreachable(String),
    #[error("frame acquisition failed: {0}")]
    AcquisitionFailed(String),
    #[error("face detection failed: {0}")]
    DetectionFailed(String),
}

/// Source of camera frames (webcam, MJPEG stream, recorded sequence).
pub trait FrameFeed {
    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VisionError>;
}

/// Face detection plus embedding extraction over one frame.
///
/// A frame with no faces returns an empty vec; that is not an error.
pub trait FaceVision {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, VisionError>;
}
