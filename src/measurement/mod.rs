//! Brightness measurement module
//!
//! This module samples the located pattern: a shrink-search for a flat block
//! on the bright central spot, a grow-search for flat background blocks in
//! angular sectors around the ring, and the ratio of the two.

pub mod inner;
pub mod outer;
pub mod reflectivity;

pub use inner::{optimize_inner, InnerRegionOptimizer};
pub use outer::{optimize_outer, OuterRegionOptimizer};
pub use reflectivity::compute_reflectivity;

use crate::constants::SENTINEL_INVALID;
use crate::matrix::Rect;
use serde::{Deserialize, Serialize};

/// Sampled block and its mean brightness
///
/// `brightness` is `None` when the search never observed a non-empty block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionMeasurement {
    /// Sampled block in matrix coordinates
    pub rect: Rect,
    pub brightness: Option<f64>,
    /// Whether the block passed the homogeneity threshold
    pub homogeneous: bool,
}

impl RegionMeasurement {
    /// Measurement without any observed block
    pub fn invalid(rect: Rect) -> Self {
        Self {
            rect,
            brightness: None,
            homogeneous: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.brightness.is_some()
    }

    /// Brightness, or [`SENTINEL_INVALID`] for an invalid region
    pub fn brightness_or_sentinel(&self) -> f64 {
        self.brightness.unwrap_or(SENTINEL_INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_only_for_invalid() {
        let invalid = RegionMeasurement::invalid(Rect::default());
        assert!(!invalid.is_valid());
        assert_eq!(invalid.brightness_or_sentinel(), -1.0);

        let valid = RegionMeasurement {
            rect: Rect::new(1, 2, 3, 4),
            brightness: Some(0.0),
            homogeneous: true,
        };
        assert!(valid.is_valid());
        assert_eq!(valid.brightness_or_sentinel(), 0.0);
    }
}
