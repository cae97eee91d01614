use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bounding box for a detected face within a camera frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face embedding vector produced by the external vision provider.
///
/// All embeddings handled by one gallery come from the same provider and
/// share a fixed dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance to another embedding. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One face found in a frame: where it is, and its embedding.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Camera placement that produced an observation.
///
/// Serialized with the wire strings the event store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "entrance/exit")]
    EntranceExit,
    #[serde(rename = "checkout")]
    Checkout,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::EntranceExit => "entrance/exit",
            Location::Checkout => "checkout",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown location {0:?} (expected \"entrance/exit\" or \"checkout\")")]
pub struct ParseLocationError(String);

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrance/exit" => Ok(Location::EntranceExit),
            "checkout" => Ok(Location::Checkout),
            other => Err(ParseLocationError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Embedding::new(vec![0.5, 0.5, 0.5]);
        let b = Embedding::new(vec![0.5, 0.5, 0.5]);
        assert!(a.distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_distance_unit_apart() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Embedding::new(vec![0.1, 0.9, 0.3]);
        let b = Embedding::new(vec![0.7, 0.2, 0.4]);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_location_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Location::EntranceExit).unwrap(),
            "\"entrance/exit\""
        );
        assert_eq!(
            serde_json::to_string(&Location::Checkout).unwrap(),
            "\"checkout\""
        );
    }

    #[test]
    fn test_location_round_trip() {
        for loc in [Location::EntranceExit, Location::Checkout] {
            assert_eq!(loc.as_str().parse::<Location>().unwrap(), loc);
        }
    }

    #[test]
    fn test_location_parse_rejects_unknown() {
        assert!("loading dock".parse::<Location>().is_err());
    }
}
