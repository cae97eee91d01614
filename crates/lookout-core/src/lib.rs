//! lookout-core — identity resolution and visit classification.
//!
//! Pure decision logic: matching face embeddings against the identity
//! gallery, and collapsing per-identity location events into classified
//! visits. No I/O lives in this crate.

pub mod gallery;
pub mod types;
pub mod visit;

pub use gallery::{FaceIdentity, GalleryError, IdentityGallery, Resolution};
pub use types::{BoundingBox, DetectedFace, Embedding, Location};
pub use visit::{classify, collapse, Observation, SuspiciousEntry, Verdict, VisitStep};
