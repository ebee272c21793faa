//! Inner region shrink-search
//!
//! Starts from the square inscribed in the inner edge circle and shrinks it
//! around the centroid until the covered pixels are flat enough.

use super::RegionMeasurement;
use crate::config::InnerRegionConfig;
use crate::detection::Centroid;
use crate::matrix::{BrightnessMatrix, Point};
use crate::{AnalysisError, Result};
use std::f64::consts::SQRT_2;
use tracing::debug;

/// Shrink-search for a homogeneous block on the bright spot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnerRegionOptimizer {
    std_target: f64,
    shrink_factor: f64,
}

impl InnerRegionOptimizer {
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` unless
    /// `0 < shrink_factor < 1` and `std_target >= 0`.
    pub fn new(std_target: f64, shrink_factor: f64) -> Result<Self> {
        InnerRegionConfig {
            std_target,
            shrink_factor,
        }
        .validate()?;
        Ok(Self {
            std_target,
            shrink_factor,
        })
    }

    pub fn from_config(config: &InnerRegionConfig) -> Result<Self> {
        Self::new(config.std_target, config.shrink_factor)
    }

    /// Search the block around `centroid`
    ///
    /// `centroid` is relative to `origin`, the selection corner in matrix
    /// coordinates. The first block has half-width `d_min / sqrt(2)`. The
    /// search stops on the first block whose standard deviation is within
    /// the target, or on the first block covering no pixels. In the latter
    /// case the last observed block is reported, flagged as not homogeneous.
    pub fn optimize(
        &self,
        matrix: &BrightnessMatrix,
        origin: Point,
        centroid: Centroid,
        d_min: f64,
    ) -> Result<RegionMeasurement> {
        if !(d_min.is_finite() && d_min >= 0.0) {
            return Err(AnalysisError::invalid_parameter("d_min", d_min));
        }
        if !(centroid.x.is_finite() && centroid.y.is_finite()) {
            return Err(AnalysisError::invalid_parameter(
                "centroid",
                format!("({}, {})", centroid.x, centroid.y),
            ));
        }

        let (ox, oy) = (origin.x as i64, origin.y as i64);
        let mut measurement: Option<RegionMeasurement> = None;
        let mut eta = 1.0;
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            let a = eta * d_min / SQRT_2;
            let x1 = ox + (centroid.x - a).round() as i64;
            let x2 = ox + (centroid.x + a).round() as i64;
            let y1 = oy + (centroid.y - a).round() as i64;
            let y2 = oy + (centroid.y + a).round() as i64;
            let rect = matrix.clamp_bounds(x1, y1, x2, y2);

            let Some(stats) = matrix.block_stats(x1, y1, x2, y2) else {
                debug!(iterations, "inner search left the matrix");
                return Ok(measurement.unwrap_or(RegionMeasurement::invalid(rect)));
            };

            let current = RegionMeasurement {
                rect,
                brightness: Some(stats.mean),
                homogeneous: stats.std <= self.std_target,
            };
            if current.homogeneous {
                debug!(iterations, mean = stats.mean, std = stats.std, "inner block accepted");
                return Ok(current);
            }
            measurement = Some(current);
            eta *= self.shrink_factor;
        }
    }
}

/// Shrink-search the inner block with explicit tunables
pub fn optimize_inner(
    matrix: &BrightnessMatrix,
    origin: Point,
    centroid: Centroid,
    d_min: f64,
    std_target: f64,
    shrink_factor: f64,
) -> Result<RegionMeasurement> {
    InnerRegionOptimizer::new(std_target, shrink_factor)?.optimize(matrix, origin, centroid, d_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Rect;
    use crate::test_utils::draw_spot_image;
    use approx::assert_relative_eq;

    fn center(x: f64, y: f64) -> Centroid {
        Centroid { x, y }
    }

    #[test]
    fn test_rejects_non_shrinking_factor() {
        assert!(InnerRegionOptimizer::new(10.0, 1.0).is_err());
        assert!(InnerRegionOptimizer::new(10.0, 0.0).is_err());
        assert!(InnerRegionOptimizer::new(-1.0, 0.9).is_err());
        assert!(InnerRegionOptimizer::new(10.0, 0.9).is_ok());
    }

    #[test]
    fn test_homogeneous_first_block_accepted() {
        let m = draw_spot_image(200, 200, [100.0, 100.0], 20.0, 200, 20);
        let result = optimize_inner(&m, Point::default(), center(100.0, 100.0), 20.0, 10.0, 0.9)
            .unwrap();
        assert_eq!(result.rect, Rect::new(86, 86, 28, 28));
        assert_eq!(result.brightness, Some(200.0));
        assert!(result.homogeneous);
    }

    #[test]
    fn test_origin_offsets_block() {
        let m = draw_spot_image(200, 200, [100.0, 100.0], 20.0, 200, 20);
        let result = optimize_inner(&m, Point::new(50, 60), center(50.0, 40.0), 20.0, 10.0, 0.9)
            .unwrap();
        assert_eq!(result.rect, Rect::new(86, 86, 28, 28));
        assert_eq!(result.brightness, Some(200.0));
    }

    #[test]
    fn test_shrinks_until_flat() {
        // Flat 100 on [14, 26) x [14, 26), zero around it
        let m = BrightnessMatrix::from_fn(40, 40, |x, y| {
            if (14..26).contains(&x) && (14..26).contains(&y) {
                100
            } else {
                0
            }
        });
        let d_min = 10.0 * SQRT_2;
        let result = optimize_inner(&m, Point::default(), center(20.0, 20.0), d_min, 10.0, 0.9)
            .unwrap();
        assert_eq!(result.rect, Rect::new(14, 14, 12, 12));
        assert_relative_eq!(result.brightness.unwrap(), 100.0);
        assert!(result.homogeneous);
    }

    #[test]
    fn test_centroid_outside_matrix_is_invalid() {
        let m = BrightnessMatrix::filled(50, 50, 80);
        let result = optimize_inner(&m, Point::default(), center(-500.0, -500.0), 10.0, 10.0, 0.9)
            .unwrap();
        assert!(result.brightness.is_none());
        assert!(result.rect.is_empty());
        assert_eq!(result.brightness_or_sentinel(), -1.0);
    }

    #[test]
    fn test_keeps_last_observed_block_when_search_leaves_matrix() {
        // Checkerboard never passes the threshold; the block slides out on the left
        let m = BrightnessMatrix::from_fn(20, 20, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 });
        let result = optimize_inner(
            &m,
            Point::default(),
            center(-3.0, 10.0),
            10.0 * SQRT_2,
            10.0,
            0.9,
        )
        .unwrap();
        assert!(result.brightness.is_some());
        assert!(!result.homogeneous);
        assert!(!result.rect.is_empty());
        assert_eq!(result.rect.x, 0);
    }

    #[test]
    fn test_rejects_non_finite_radius() {
        let m = BrightnessMatrix::filled(10, 10, 0);
        assert!(optimize_inner(&m, Point::default(), center(5.0, 5.0), f64::NAN, 10.0, 0.9).is_err());
        assert!(optimize_inner(&m, Point::default(), center(5.0, 5.0), f64::INFINITY, 10.0, 0.9)
            .is_err());
    }
}
