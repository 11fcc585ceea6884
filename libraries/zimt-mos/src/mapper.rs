//! Distance to MOS mapping
//!
//! A perceptual distance of 0 means the signals are indistinguishable (MOS 5) and the
//! score decays exponentially towards MOS 1 as the distance grows:
//!
//! ```text
//! mos = 1 + 4 * exp(-decay * distance)
//! ```
//!
//! The decay rate is fitted to listening-test calibration anchors by least squares
//! on `ln((mos - 1) / 4) = -decay * distance`.

use crate::error::{MosError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lowest score on the scale
pub const MIN_MOS: f64 = 1.0;

/// Highest score on the scale
pub const MAX_MOS: f64 = 5.0;

/// Decay rate fitted to [`CALIBRATION_ANCHORS`]
pub const DEFAULT_DECAY: f64 = 3.344;

/// (distance, MOS) pairs the mapping must reproduce
pub const CALIBRATION_ANCHORS: [(f64, f64); 5] = [
    (0.0, 5.0),
    (0.1, 3.863_069_772_720_337),
    (0.5, 1.751_483_678_817_749),
    (0.7, 1.385_002_374_649_048),
    (1.0, 1.141_181_945_800_781),
];

/// Largest acceptable deviation from a calibration anchor
pub const CALIBRATION_TOLERANCE: f64 = 1e-2;

/// Maps perceptual distances to mean opinion scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MosParameters")]
pub struct MosMapper {
    /// Exponential decay per unit of distance
    decay: f64,
}

/// Serialized form of [`MosMapper`], validated on the way in
#[derive(Deserialize)]
struct MosParameters {
    decay: f64,
}

impl TryFrom<MosParameters> for MosMapper {
    type Error = MosError;

    fn try_from(parameters: MosParameters) -> Result<Self> {
        Self::new(parameters.decay)
    }
}

impl Default for MosMapper {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
        }
    }
}

impl MosMapper {
    /// Create a mapper with a custom decay rate
    ///
    /// # Errors
    /// Returns `InvalidParameters` unless `decay` is positive and finite.
    pub fn new(decay: f64) -> Result<Self> {
        if !(decay.is_finite() && decay > 0.0) {
            return Err(MosError::InvalidParameters(format!(
                "decay must be positive, got {}",
                decay
            )));
        }
        Ok(Self { decay })
    }

    /// Fit the decay rate to `(distance, mos)` anchors
    ///
    /// Anchors at distance 0 carry no information about the decay and only need to
    /// sit at the top of the scale.
    ///
    /// # Errors
    /// Returns `InvalidAnchors` if an anchor is non-finite, has a negative distance,
    /// a score outside (1, 5], or if no anchor has a positive distance.
    pub fn fit(anchors: &[(f64, f64)]) -> Result<Self> {
        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for &(distance, mos) in anchors {
            if !(distance.is_finite() && mos.is_finite()) {
                return Err(MosError::InvalidAnchors(format!(
                    "anchor ({}, {}) is not finite",
                    distance, mos
                )));
            }
            if distance < 0.0 {
                return Err(MosError::InvalidAnchors(format!(
                    "anchor distance {} is negative",
                    distance
                )));
            }
            if mos <= MIN_MOS || mos > MAX_MOS {
                return Err(MosError::InvalidAnchors(format!(
                    "anchor score {} is outside ({}, {}]",
                    mos, MIN_MOS, MAX_MOS
                )));
            }
            let log_fraction = ((mos - MIN_MOS) / (MAX_MOS - MIN_MOS)).ln();
            numerator -= distance * log_fraction;
            denominator += distance * distance;
        }

        if denominator == 0.0 {
            return Err(MosError::InvalidAnchors(
                "at least one anchor needs a positive distance".into(),
            ));
        }

        let mapper = Self::new(numerator / denominator)?;
        let error = mapper.max_anchor_error(anchors);
        if error > CALIBRATION_TOLERANCE {
            warn!(
                "Fitted MOS curve misses an anchor by {:.4} (tolerance {})",
                error, CALIBRATION_TOLERANCE
            );
        }
        debug!(decay = mapper.decay, anchors = anchors.len(), "Fitted MOS mapping");
        Ok(mapper)
    }

    /// Mapper fitted to [`CALIBRATION_ANCHORS`]
    pub fn calibrated() -> Self {
        Self::fit(&CALIBRATION_ANCHORS).unwrap_or_default()
    }

    /// Exponential decay per unit of distance
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Mean opinion score for a perceptual distance
    ///
    /// Negative distances are treated as zero.
    pub fn map(&self, distance: f64) -> f64 {
        let distance = distance.max(0.0);
        (MIN_MOS + (MAX_MOS - MIN_MOS) * (-self.decay * distance).exp()).clamp(MIN_MOS, MAX_MOS)
    }

    /// Perceptual distance that maps to `mos`
    ///
    /// Returns `None` for scores at or below the bottom of the scale, which no finite
    /// distance reaches, or above the top of it.
    pub fn distance_for(&self, mos: f64) -> Option<f64> {
        if !(mos > MIN_MOS && mos <= MAX_MOS) {
            return None;
        }
        Some(-((mos - MIN_MOS) / (MAX_MOS - MIN_MOS)).ln() / self.decay)
    }

    /// Largest absolute difference between the mapping and `anchors`
    pub fn max_anchor_error(&self, anchors: &[(f64, f64)]) -> f64 {
        anchors
            .iter()
            .map(|&(distance, mos)| (self.map(distance) - mos).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_anchors() {
        let mapper = MosMapper::default();
        for (distance, mos) in CALIBRATION_ANCHORS {
            assert!(
                (mapper.map(distance) - mos).abs() < CALIBRATION_TOLERANCE,
                "distance {} mapped to {}, expected {}",
                distance,
                mapper.map(distance),
                mos
            );
        }
    }

    #[test]
    fn test_fit_recovers_default_decay() {
        let mapper = MosMapper::fit(&CALIBRATION_ANCHORS).unwrap();
        assert!((mapper.decay() - DEFAULT_DECAY).abs() < 1e-3);
        assert!(mapper.max_anchor_error(&CALIBRATION_ANCHORS) < 1e-6);
        assert_eq!(MosMapper::calibrated(), mapper);
    }

    #[test]
    fn test_fit_rejects_bad_anchors() {
        assert!(MosMapper::fit(&[]).is_err());
        assert!(MosMapper::fit(&[(0.0, 5.0)]).is_err());
        assert!(MosMapper::fit(&[(0.5, 1.0)]).is_err());
        assert!(MosMapper::fit(&[(0.5, 5.5)]).is_err());
        assert!(MosMapper::fit(&[(-0.5, 3.0)]).is_err());
        assert!(MosMapper::fit(&[(f64::NAN, 3.0)]).is_err());
    }

    #[test]
    fn test_map_bounds() {
        let mapper = MosMapper::default();
        assert_eq!(mapper.map(0.0), MAX_MOS);
        assert_eq!(mapper.map(-1.0), MAX_MOS);
        assert!(mapper.map(100.0) >= MIN_MOS);
        assert!(mapper.map(100.0) < 1.0001);
    }

    #[test]
    fn test_distance_for_inverts_map() {
        let mapper = MosMapper::default();
        for distance in [0.0, 0.05, 0.3, 0.9] {
            let back = mapper.distance_for(mapper.map(distance)).unwrap();
            assert!((back - distance).abs() < 1e-9);
        }
        assert_eq!(mapper.distance_for(MIN_MOS), None);
        assert_eq!(mapper.distance_for(6.0), None);
    }

    #[test]
    fn test_deserialize_validates_decay() {
        let mapper: MosMapper = serde_json::from_str(r#"{"decay": 3.0}"#).unwrap();
        assert_eq!(mapper.decay(), 3.0);

        for json in [r#"{"decay": -1.0}"#, r#"{"decay": 0.0}"#] {
            let err = serde_json::from_str::<MosMapper>(json).unwrap_err();
            assert!(err.to_string().contains("decay must be positive"), "{}", err);
        }
    }

    #[test]
    fn test_invalid_decay() {
        assert!(MosMapper::new(0.0).is_err());
        assert!(MosMapper::new(f64::INFINITY).is_err());
        assert!(MosMapper::new(2.0).is_ok());
    }
}
