//! Face-crop persistence and startup bootstrap.
//!
//! Crops are observational output only: the pipeline never reads pixels
//! back. Filenames, however, seed the gallery's `unknown_<n>` counter on
//! startup so a restarted monitor cannot re-issue a persisted index.

use image::RgbImage;
use lookout_core::gallery::parse_unknown_index;
use lookout_core::{BoundingBox, IdentityGallery};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("crop region is empty after clamping to the frame")]
    EmptyRegion,
    #[error("crops directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Write the face region to `<dir>/<label>.jpg`, replacing any previous
/// representative crop for that label.
pub fn save_crop(
    frame: &RgbImage,
    bbox: &BoundingBox,
    dir: &Path,
    label: &str,
) -> Result<PathBuf, CropError> {
    let (frame_w, frame_h) = frame.dimensions();
    let x = (bbox.x.max(0.0) as u32).min(frame_w);
    let y = (bbox.y.max(0.0) as u32).min(frame_h);
    let w = (bbox.width.max(0.0) as u32).min(frame_w - x);
    let h = (bbox.height.max(0.0) as u32).min(frame_h - y);
    if w == 0 || h == 0 {
        return Err(CropError::EmptyRegion);
    }

    std::fs::create_dir_all(dir)?;
    let crop = image::imageops::crop_imm(frame, x, y, w, h).to_image();
    let path = dir.join(format!("{label}.jpg"));
    crop.save(&path)?;
    Ok(path)
}

/// Labels recovered from `unknown_<n>.*` filenames in the crops directory.
pub fn scan_unknown_labels(dir: &Path) -> Result<Vec<String>, CropError> {
    let mut labels = Vec::new();
    if !dir.exists() {
        return Ok(labels);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if parse_unknown_index(stem).is_some() {
            labels.push(stem.to_string());
        }
    }
    labels.sort();
    Ok(labels)
}

/// Reserve every persisted `unknown_<n>` label in the gallery. Returns how
/// many labels were reserved.
pub fn bootstrap_gallery(
    gallery: &mut IdentityGallery,
    crops_dir: &Path,
) -> Result<usize, CropError> {
    let labels = scan_unknown_labels(crops_dir)?;
    let count = labels.len();
    for label in labels {
        gallery.reserve_label(label);
    }
    if count > 0 {
        tracing::info!(count, dir = %crops_dir.display(), "reserved persisted unknown labels");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lookout_core::{Embedding, Resolution};

    fn frame(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([120, 90, 60]))
    }

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_save_crop_writes_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_crop(
            &frame(100, 80),
            &bbox(10.0, 10.0, 40.0, 30.0),
            dir.path(),
            "unknown_1",
        )
        .unwrap();
        assert_eq!(path, dir.path().join("unknown_1.jpg"));
        assert!(path.exists());
    }

    #[test]
    fn test_save_crop_clamps_to_frame() {
        let dir = tempfile::tempdir().unwrap();
        // Box hangs off the right edge; the crop clamps instead of failing.
        let path = save_crop(
            &frame(100, 80),
            &bbox(90.0, 70.0, 40.0, 30.0),
            dir.path(),
            "alice",
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_crop_rejects_degenerate_region() {
        let dir = tempfile::tempdir().unwrap();
        let result = save_crop(
            &frame(100, 80),
            &bbox(200.0, 0.0, 40.0, 30.0),
            dir.path(),
            "alice",
        );
        assert!(matches!(result, Err(CropError::EmptyRegion)));
    }

    #[test]
    fn test_scan_unknown_labels_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["unknown_2.jpg", "unknown_1.jpg", "alice.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let labels = scan_unknown_labels(dir.path()).unwrap();
        assert_eq!(labels, vec!["unknown_1", "unknown_2"]);
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let labels = scan_unknown_labels(&dir.path().join("nope")).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_bootstrap_blocks_reissued_indices() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("unknown_1.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("unknown_2.jpg"), b"x").unwrap();

        let mut gallery = IdentityGallery::with_default_thresholds();
        let reserved = bootstrap_gallery(&mut gallery, dir.path()).unwrap();
        assert_eq!(reserved, 2);

        let now = Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap();
        let r = gallery.resolve(&Embedding::new(vec![0.0, 0.0]), now);
        assert_eq!(
            r,
            Resolution::Enrolled {
                label: "unknown_3".into()
            }
        );
    }
}
