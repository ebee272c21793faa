//! Outer region grow-search
//!
//! The plane around the centroid is split into `N` equal wedges. In each
//! wedge a small square is placed on the bisector at `1.2 * d_max` from the
//! centroid and grown for as long as it stays flat, outside the ring and
//! inside its wedge.

use super::RegionMeasurement;
use crate::config::OuterRegionConfig;
use crate::constants::outer::{CENTER_DISTANCE_RATIO, DEFAULT_SECTORS};
use crate::detection::Centroid;
use crate::matrix::{BrightnessMatrix, Point};
use crate::{AnalysisError, Result};
use std::f64::consts::{PI, TAU};
use tracing::debug;

/// Per-sector grow-search for homogeneous background blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuterRegionOptimizer {
    std_target: f64,
    grow_factor: f64,
    sectors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchEnd {
    LeftSector,
    Heterogeneous,
    OutOfReach,
}

impl OuterRegionOptimizer {
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` unless `grow_factor > 1`,
    /// `sectors > 0` and `std_target >= 0`.
    pub fn new(std_target: f64, grow_factor: f64, sectors: usize) -> Result<Self> {
        OuterRegionConfig {
            std_target,
            grow_factor,
            sectors,
        }
        .validate()?;
        Ok(Self {
            std_target,
            grow_factor,
            sectors,
        })
    }

    /// Optimizer over the default sector count
    pub fn with_default_sectors(std_target: f64, grow_factor: f64) -> Result<Self> {
        Self::new(std_target, grow_factor, DEFAULT_SECTORS)
    }

    pub fn from_config(config: &OuterRegionConfig) -> Result<Self> {
        Self::new(config.std_target, config.grow_factor, config.sectors)
    }

    pub fn sectors(&self) -> usize {
        self.sectors
    }

    /// Angle of the bisector of sector `i`
    pub fn sector_bisector(&self, i: usize) -> f64 {
        PI / self.sectors as f64 * (2 * i + 1) as f64
    }

    /// Angular range `[start, end]` of sector `i`, both ends inclusive
    pub fn sector_range(&self, i: usize) -> (f64, f64) {
        let n = self.sectors as f64;
        (PI / n * (2 * i) as f64, PI / n * (2 * (i + 1)) as f64)
    }

    /// Whether the offset `(dx, dy)` from the centroid lies outside the
    /// ring of radius `d_max` and inside sector `i`
    pub fn corner_in_sector(&self, d_max: f64, i: usize, dx: f64, dy: f64) -> bool {
        if dx.hypot(dy) < d_max {
            return false;
        }
        let mut angle = dy.atan2(dx);
        if angle < 0.0 {
            angle += TAU;
        }
        let (start, end) = self.sector_range(i);
        angle >= start && angle <= end
    }

    /// Whether all four corners of the square centered at `(cx, cy)` with
    /// half-width `a` pass [`Self::corner_in_sector`]
    pub fn box_in_sector(&self, d_max: f64, i: usize, cx: f64, cy: f64, a: f64) -> bool {
        [(cx - a, cy - a), (cx - a, cy + a), (cx + a, cy - a), (cx + a, cy + a)]
            .iter()
            .all(|&(x, y)| self.corner_in_sector(d_max, i, x, y))
    }

    /// Search every sector independently
    ///
    /// `centroid` is relative to `origin`, the selection corner in matrix
    /// coordinates. Sectors where no block was ever accepted report an
    /// invalid measurement.
    pub fn optimize(
        &self,
        matrix: &BrightnessMatrix,
        origin: Point,
        centroid: Centroid,
        d_max: f64,
    ) -> Result<Vec<RegionMeasurement>> {
        if !(d_max.is_finite() && d_max >= 0.0) {
            return Err(AnalysisError::invalid_parameter("d_max", d_max));
        }
        if !(centroid.x.is_finite() && centroid.y.is_finite()) {
            return Err(AnalysisError::invalid_parameter(
                "centroid",
                format!("({}, {})", centroid.x, centroid.y),
            ));
        }

        Ok((0..self.sectors)
            .map(|i| self.search_sector(matrix, origin, centroid, d_max, i))
            .collect())
    }

    fn search_sector(
        &self,
        matrix: &BrightnessMatrix,
        origin: Point,
        centroid: Centroid,
        d_max: f64,
        i: usize,
    ) -> RegionMeasurement {
        let theta = self.sector_bisector(i);
        let d = CENTER_DISTANCE_RATIO * d_max;
        let (cx, cy) = (d * theta.cos(), d * theta.sin());
        let (abs_x, abs_y) = (origin.x as f64 + centroid.x, origin.y as f64 + centroid.y);

        // Past this half-width the square covers the whole matrix
        let reach = (matrix.width() + matrix.height()) as f64 + d;

        let mut accepted = RegionMeasurement::invalid(Default::default());
        let mut eta = 1.0;
        let end = loop {
            let a = eta;
            if a > reach {
                break SearchEnd::OutOfReach;
            }
            if !self.box_in_sector(d_max, i, cx, cy, a) {
                break SearchEnd::LeftSector;
            }

            let x1 = (abs_x + cx - a).round().max(0.0) as i64;
            let x2 = (abs_x + cx + a).round().max(0.0) as i64;
            let y1 = (abs_y + cy - a).round().max(0.0) as i64;
            let y2 = (abs_y + cy + a).round().max(0.0) as i64;

            match matrix.block_stats(x1, y1, x2, y2) {
                Some(stats) if stats.std <= self.std_target => {
                    accepted = RegionMeasurement {
                        rect: matrix.clamp_bounds(x1, y1, x2, y2),
                        brightness: Some(stats.mean),
                        homogeneous: true,
                    };
                }
                Some(_) => break SearchEnd::Heterogeneous,
                None => {}
            }
            eta *= self.grow_factor;
        };

        debug!(
            sector = i,
            ?end,
            brightness = ?accepted.brightness,
            "outer search finished"
        );
        accepted
    }
}

/// Grow-search `sectors` background blocks with explicit tunables
pub fn optimize_outer(
    matrix: &BrightnessMatrix,
    origin: Point,
    centroid: Centroid,
    d_max: f64,
    std_target: f64,
    grow_factor: f64,
    sectors: usize,
) -> Result<Vec<RegionMeasurement>> {
    OuterRegionOptimizer::new(std_target, grow_factor, sectors)?
        .optimize(matrix, origin, centroid, d_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_spot_image;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_non_growing_factor() {
        assert!(OuterRegionOptimizer::new(3.0, 1.0, 10).is_err());
        assert!(OuterRegionOptimizer::new(3.0, 0.5, 10).is_err());
        assert!(OuterRegionOptimizer::new(3.0, 1.1, 0).is_err());
        assert_eq!(
            OuterRegionOptimizer::with_default_sectors(3.0, 1.1).unwrap().sectors(),
            4
        );
    }

    #[test]
    fn test_four_sector_bisectors() {
        let opt = OuterRegionOptimizer::with_default_sectors(3.0, 1.1).unwrap();
        let expected = [PI / 4.0, 3.0 * PI / 4.0, 5.0 * PI / 4.0, 7.0 * PI / 4.0];
        for (i, angle) in expected.iter().enumerate() {
            assert_relative_eq!(opt.sector_bisector(i), *angle, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_boundary_angle_valid_for_both_sectors() {
        let opt = OuterRegionOptimizer::with_default_sectors(3.0, 1.1).unwrap();
        // Straight down the +y axis sits on the edge between sectors 0 and 1
        assert!(opt.corner_in_sector(4.0, 0, 0.0, 5.0));
        assert!(opt.corner_in_sector(4.0, 1, 0.0, 5.0));
        assert!(!opt.corner_in_sector(4.0, 2, 0.0, 5.0));
    }

    #[test]
    fn test_corner_inside_ring_is_invalid() {
        let opt = OuterRegionOptimizer::with_default_sectors(3.0, 1.1).unwrap();
        assert!(!opt.corner_in_sector(10.0, 0, 3.0, 3.0));
        assert!(opt.corner_in_sector(10.0, 0, 8.0, 8.0));
        // Negative angles wrap into the last sector
        assert!(opt.corner_in_sector(10.0, 3, 8.0, -8.0));
        assert!(!opt.corner_in_sector(10.0, 0, 8.0, -8.0));
    }

    #[test]
    fn test_box_crossing_sector_edge_is_invalid() {
        let opt = OuterRegionOptimizer::with_default_sectors(3.0, 1.1).unwrap();
        assert!(opt.box_in_sector(10.0, 0, 20.0, 20.0, 5.0));
        assert!(!opt.box_in_sector(10.0, 0, 20.0, 20.0, 21.0));
    }

    #[test]
    fn test_uniform_background_around_spot() {
        let m = draw_spot_image(200, 200, [100.0, 100.0], 20.0, 200, 20);
        let centroid = Centroid { x: 100.0, y: 100.0 };
        let outer = optimize_outer(&m, Point::default(), centroid, 20.0, 3.0, 1.1, 10).unwrap();

        assert_eq!(outer.len(), 10);
        for (i, region) in outer.iter().enumerate() {
            assert_eq!(region.brightness, Some(20.0), "sector {}", i);
            assert!(region.homogeneous);
            assert!(region.rect.area() >= 4);
        }
    }

    #[test]
    fn test_sector_outside_matrix_is_invalid() {
        // Spot in the top-left corner: sectors pointing up and left leave the matrix
        let m = draw_spot_image(100, 100, [0.0, 0.0], 8.0, 200, 20);
        let centroid = Centroid { x: 0.0, y: 0.0 };
        let outer = optimize_outer(&m, Point::default(), centroid, 10.0, 3.0, 1.1, 4).unwrap();

        assert_eq!(outer[0].brightness, Some(20.0));
        assert!(outer[1].brightness.is_none());
        assert!(outer[2].brightness.is_none());
        assert!(outer[3].brightness.is_none());
    }

    #[test]
    fn test_single_sector_terminates() {
        let m = BrightnessMatrix::filled(30, 30, 50);
        let centroid = Centroid { x: 15.0, y: 15.0 };
        let outer = optimize_outer(&m, Point::default(), centroid, 0.0, 3.0, 1.1, 1).unwrap();
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].brightness, Some(50.0));
    }

    #[test]
    fn test_empty_block_grows_and_retries() {
        // The first boxes of sectors 1 and 2 lie left of column 0 and cover
        // no pixels; the search keeps growing until it reaches the matrix.
        let m = BrightnessMatrix::filled(100, 100, 40);
        let centroid = Centroid { x: 7.9, y: 50.0 };
        let outer = optimize_outer(&m, Point::default(), centroid, 10.0, 3.0, 1.1, 4).unwrap();

        for sector in [1, 2] {
            let r = outer[sector];
            assert_eq!(r.brightness, Some(40.0));
            assert!(r.homogeneous);
            assert_eq!(r.rect.x, 0);
            assert_eq!(r.rect.width, 1);
            assert_eq!(r.rect.height, 3);
        }
        assert_eq!(outer[1].rect.y, 57);
        assert_eq!(outer[2].rect.y, 40);
    }
}
