//! Centroid and radius estimation from an edge point set
//!
//! The pattern is located as the mean of all edge pixels. The smallest and
//! largest distances from that centroid to an edge pixel bound the bright
//! spot from inside and outside.

use super::edges::EdgeMap;
use crate::matrix::Point;
use serde::{Deserialize, Serialize};

/// Real-valued pattern center, relative to the edge map origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

/// Minimum and maximum centroid-to-edge distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusPair {
    pub d_min: f64,
    pub d_max: f64,
}

/// Located pattern
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeEstimate {
    /// Edge pixels in edge-map-local coordinates
    pub points: Vec<Point>,
    pub centroid: Centroid,
    pub radii: RadiusPair,
}

impl ShapeEstimate {
    /// Edge pixels translated into the full matrix frame
    pub fn points_in_frame(&self, origin: Point) -> Vec<Point> {
        self.points.iter().map(|p| p.offset(origin)).collect()
    }
}

/// Locate the pattern described by `edges`
///
/// Returns `None` when the map has no edge pixel.
pub fn estimate_shape(edges: &EdgeMap) -> Option<ShapeEstimate> {
    let points = edges.points();
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let centroid = Centroid {
        x: sum_x / n,
        y: sum_y / n,
    };

    let (d_min, d_max) = points
        .iter()
        .map(|p| (p.x as f64 - centroid.x).hypot(p.y as f64 - centroid.y))
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), d| (lo.min(d), hi.max(d)));

    Some(ShapeEstimate {
        points,
        centroid,
        radii: RadiusPair { d_min, d_max },
    })
}
