//! Clip-and-affine mappings between the bounded network range and real
//! value ranges.
use crate::error::AgentError;
use rover_core::Tensor;
use serde::{Deserialize, Serialize};

/// A value range mapped linearly onto the bounded network range [-1, 1].
///
/// Both directions clip first, so out-of-range values saturate instead of
/// extrapolating.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Scale {
    /// Lower bound of the real range.
    pub min: f32,

    /// Upper bound of the real range.
    pub max: f32,
}

impl Scale {
    /// Creates the range after checking `min < max`.
    pub fn new(min: f32, max: f32) -> Result<Self, AgentError> {
        if !(min < max) {
            return Err(AgentError::InvalidRange {
                what: "scale".to_string(),
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    /// Maps a normalized value in [-1, 1] to the real range.
    pub fn denormalize(&self, y: f32) -> f32 {
        let m = (self.max - self.min) / 2.0;
        let q = (self.max + self.min) / 2.0;
        y.clamp(-1.0, 1.0) * m + q
    }

    /// Maps a real value to the normalized range [-1, 1].
    pub fn normalize(&self, v: f32) -> f32 {
        let m = 2.0 / (self.max - self.min);
        let q = -self.min * m - 1.0;
        v.clamp(self.min, self.max) * m + q
    }

    /// Elementwise [`denormalize`](Self::denormalize).
    pub fn denormalize_row(&self, y: &Tensor) -> Tensor {
        y.mapv(|v| self.denormalize(v))
    }

    /// Elementwise [`normalize`](Self::normalize).
    pub fn normalize_row(&self, v: &Tensor) -> Tensor {
        v.mapv(|y| self.normalize(y))
    }

    /// Denormalizes a bounded output row into centered preferences.
    ///
    /// The mean is subtracted so that the preference vector is the canonical
    /// (shift-free) representative of its softmax distribution.
    pub fn preferences(&self, y: &Tensor) -> Tensor {
        let mut h = self.denormalize_row(y);
        let mean = h.mean().unwrap_or(0.0);
        h.mapv_inplace(|v| v - mean);
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_core::row;

    #[test]
    fn test_round_trip_inside_range() {
        let scale = Scale::new(-4.0, 2.0).unwrap();
        for v in [-4.0, -1.0, 0.0, 1.5, 2.0] {
            assert!((scale.denormalize(scale.normalize(v)) - v).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clipping_saturates() {
        let scale = Scale::new(-1.0, 1.0).unwrap();
        assert_eq!(scale.denormalize(3.0), 1.0);
        assert_eq!(scale.denormalize(-3.0), -1.0);
        assert_eq!(scale.normalize(10.0), 1.0);
    }

    #[test]
    fn test_preferences_are_centered() {
        let scale = Scale::new(-3.0, 3.0).unwrap();
        let h = scale.preferences(&row(&[1.0, 0.0, -1.0]));
        assert!(h.mean().unwrap().abs() < 1e-6);
        assert!((h[[0, 0]] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_range_is_rejected() {
        assert!(Scale::new(1.0, 1.0).is_err());
        assert!(Scale::new(2.0, -2.0).is_err());
    }
}
