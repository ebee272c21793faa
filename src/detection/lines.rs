//! Straight fringe detection with Hough transforms
//!
//! Two strategies are available:
//! - [`LineDetectionMode::Standard`]: accumulator peaks of the standard Hough
//!   transform, each turned into the chord the infinite line cuts through the
//!   edge map frame
//! - [`LineDetectionMode::Probabilistic`]: segments from the probabilistic
//!   Hough transform, with length and gap limits scaled by the display zoom
//!
//! Segments are returned in full matrix coordinates.

use super::edges::EdgeMap;
use crate::config::LineConfig;
use crate::constants::hough::{RHO, THETA};
use crate::matrix::Point;
use crate::{AnalysisError, Result};
use opencv::{
    core::{Vec3f, Vec4i, Vector},
    imgproc::{hough_lines_def, hough_lines_p},
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Tolerance for frame intersection tests, in pixels
const FRAME_EPSILON: f64 = 1e-6;

/// Hough variant used for line detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineDetectionMode {
    #[default]
    Standard,
    Probabilistic,
}

/// Line segment between two pixel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        ((self.end.x - self.start.x) as f64).hypot((self.end.y - self.start.y) as f64)
    }
}

/// Hough line detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDetector {
    config: LineConfig,
}

impl LineDetector {
    /// Create a detector from validated line parameters
    pub fn from_config(config: &LineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config: *config })
    }

    /// Detector with default parameters and the given strategy
    pub fn with_mode(mode: LineDetectionMode) -> Self {
        Self {
            config: LineConfig {
                mode,
                ..LineConfig::default()
            },
        }
    }

    pub fn mode(&self) -> LineDetectionMode {
        self.config.mode
    }

    /// Detect lines in `edges` and translate them by `origin`
    ///
    /// `scale_factor` is the display zoom; it only affects the probabilistic
    /// strategy.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` for a non-positive scale
    /// factor, `AnalysisError::OpenCvError` if the transform fails.
    pub fn detect(
        &self,
        edges: &EdgeMap,
        origin: Point,
        scale_factor: f64,
    ) -> Result<Vec<LineSegment>> {
        if !(scale_factor > 0.0 && scale_factor.is_finite()) {
            return Err(AnalysisError::invalid_parameter("scale_factor", scale_factor));
        }
        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let lines = match self.config.mode {
            LineDetectionMode::Standard => self.detect_standard(edges, origin)?,
            LineDetectionMode::Probabilistic => {
                self.detect_probabilistic(edges, origin, scale_factor)?
            }
        };
        debug!(mode = ?self.config.mode, count = lines.len(), "detected lines");
        Ok(lines)
    }

    fn detect_standard(&self, edges: &EdgeMap, origin: Point) -> Result<Vec<LineSegment>> {
        let image = edges.to_mat()?;
        // rho, theta and votes per accumulator peak
        let mut raw = Vector::<Vec3f>::new();
        hough_lines_def(&image, &mut raw, RHO, THETA, self.config.threshold)
            .map_err(|e| AnalysisError::opencv("Hough transform", e))?;

        let peaks: Vec<(f64, f64, f64)> = raw
            .iter()
            .map(|l| (l[0] as f64, l[1] as f64, l[2] as f64))
            .collect();
        let peaks = strong_peaks(&peaks, self.config.peak_ratio);
        let peaks = suppress_neighbours(
            &peaks,
            self.config.peak_min_distance,
            self.config.peak_min_angle,
        );

        let (cols, rows) = (edges.width() as f64, edges.height() as f64);
        Ok(peaks
            .into_iter()
            .filter_map(|(rho, theta)| frame_chord(rho, theta, cols, rows))
            .map(|(start, end)| LineSegment::new(start.offset(origin), end.offset(origin)))
            .collect())
    }

    fn detect_probabilistic(
        &self,
        edges: &EdgeMap,
        origin: Point,
        scale_factor: f64,
    ) -> Result<Vec<LineSegment>> {
        let image = edges.to_mat()?;
        let mut raw = Vector::<Vec4i>::new();
        hough_lines_p(
            &image,
            &mut raw,
            RHO,
            THETA,
            self.config.probabilistic_threshold,
            (self.config.line_length * scale_factor).round(),
            (self.config.line_gap * scale_factor).round(),
        )
        .map_err(|e| AnalysisError::opencv("Probabilistic Hough transform", e))?;

        Ok(raw
            .iter()
            .map(|l| {
                LineSegment::new(
                    Point::new(l[0], l[1]).offset(origin),
                    Point::new(l[2], l[3]).offset(origin),
                )
            })
            .collect())
    }
}

/// Detect lines in `edges` with default thresholds for the given strategy
pub fn detect_lines(
    edges: &EdgeMap,
    origin: Point,
    mode: LineDetectionMode,
    scale_factor: f64,
) -> Result<Vec<LineSegment>> {
    LineDetector::with_mode(mode).detect(edges, origin, scale_factor)
}

/// Peaks with at least `ratio` times the strongest peak's votes, strongest
/// first, as `(rho, theta)`
fn strong_peaks(peaks: &[(f64, f64, f64)], ratio: f64) -> Vec<(f64, f64)> {
    let Some(max_votes) = peaks.iter().map(|p| p.2).reduce(f64::max) else {
        return Vec::new();
    };
    let mut strong: Vec<(f64, f64, f64)> = peaks
        .iter()
        .copied()
        .filter(|p| p.2 >= ratio * max_votes)
        .collect();
    strong.sort_by(|a, b| b.2.total_cmp(&a.2));
    strong.into_iter().map(|(rho, theta, _)| (rho, theta)).collect()
}

/// Drop peaks lying in the neighbourhood of a stronger, already kept peak
///
/// `peaks` must be ordered strongest first. Lines near theta = 0 and
/// theta = pi describe the same direction with opposite rho sign.
fn suppress_neighbours(peaks: &[(f64, f64)], min_distance: f64, min_angle: f64) -> Vec<(f64, f64)> {
    let mut kept: Vec<(f64, f64)> = Vec::new();
    for &(rho, theta) in peaks {
        let crowded = kept.iter().any(|&(k_rho, k_theta)| {
            let d_theta = (theta - k_theta).abs();
            if d_theta < min_angle {
                (rho - k_rho).abs() < min_distance
            } else if PI - d_theta < min_angle {
                (rho + k_rho).abs() < min_distance
            } else {
                false
            }
        });
        if !crowded {
            kept.push((rho, theta));
        }
    }
    kept
}

/// Chord cut by the line `x cos(theta) + y sin(theta) = rho` through the
/// frame `[0, cols] x [0, rows]`
///
/// Intersections with all four frame edges are evaluated and the two that
/// lie on the frame are kept, ordered by x then y. Returns `None` when the
/// line misses the frame or only touches a corner.
fn frame_chord(rho: f64, theta: f64, cols: f64, rows: f64) -> Option<(Point, Point)> {
    let (sin, cos) = theta.sin_cos();
    let mut hits: Vec<(f64, f64)> = Vec::with_capacity(4);
    if sin.abs() > FRAME_EPSILON {
        hits.push((0.0, rho / sin));
        hits.push((cols, (rho - cols * cos) / sin));
    }
    if cos.abs() > FRAME_EPSILON {
        hits.push((rho / cos, 0.0));
        hits.push(((rho - rows * sin) / cos, rows));
    }

    let on_frame = |v: f64, max: f64| v >= -FRAME_EPSILON && v <= max + FRAME_EPSILON;
    hits.retain(|&(x, y)| on_frame(x, cols) && on_frame(y, rows));
    hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    hits.dedup_by(|a, b| (a.0 - b.0).abs() < FRAME_EPSILON && (a.1 - b.1).abs() < FRAME_EPSILON);

    match (hits.first(), hits.last()) {
        (Some(&a), Some(&b)) if hits.len() >= 2 => Some((
            Point::new(a.0.round() as i32, a.1.round() as i32),
            Point::new(b.0.round() as i32, b.1.round() as i32),
        )),
        _ => None,
    }
}
