//! Edge extraction on a brightness matrix or a selection of it
//!
//! Smooths the selected pixels with a Gaussian of configurable sigma and
//! runs Canny edge detection. The resulting [`EdgeMap`] has the shape of the
//! selection; its `origin` records where the selection starts in the full
//! matrix so that downstream stages can translate back.

use crate::config::{check_sigma, EdgeConfig};
use crate::constants::edges::{CANNY_APERTURE, CANNY_L2_GRADIENT};
use crate::matrix::{BrightnessMatrix, Point, Rect};
use crate::{AnalysisError, Result};
use opencv::{
    core::{AlgorithmHint, Mat, Size, BORDER_REPLICATE},
    imgproc::{canny, gaussian_blur},
};
use tracing::debug;

/// Binary edge image in selection-local coordinates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeMap {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl EdgeMap {
    /// Build an edge map by evaluating `f(x, y)` at every pixel
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Interpret every non-zero pixel as an edge
    pub fn from_matrix(matrix: &BrightnessMatrix) -> Self {
        Self {
            width: matrix.width(),
            height: matrix.height(),
            data: matrix.as_slice().iter().map(|&v| v != 0).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    /// Number of edge pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&e| e).count()
    }

    /// True when the map has zero size or no edge pixel
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&e| e)
    }

    /// Edge pixel positions in row-major order
    pub fn points(&self) -> Vec<Point> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &e)| e)
            .map(|(i, _)| Point::new((i % self.width) as i32, (i / self.width) as i32))
            .collect()
    }

    /// Edges as 255, background as 0, in an 8-bit OpenCV `Mat`
    pub fn to_mat(&self) -> Result<Mat> {
        let levels = self.data.iter().map(|&e| if e { 255 } else { 0 }).collect();
        BrightnessMatrix::new(self.width, self.height, levels)?.to_mat()
    }
}

/// Edge map of a selection together with the selection origin
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeExtraction {
    pub edges: EdgeMap,
    /// Top-left corner of the selection in matrix coordinates
    pub origin: Point,
}

/// Gaussian-smoothed Canny edge extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeExtractor {
    sigma: f64,
    canny_low: f64,
    canny_high: f64,
}

impl EdgeExtractor {
    /// Create an extractor
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` for a negative sigma or
    /// unordered thresholds.
    pub fn new(sigma: f64, canny_low: f64, canny_high: f64) -> Result<Self> {
        EdgeConfig {
            sigma,
            canny_low,
            canny_high,
        }
        .validate()?;
        Ok(Self {
            sigma,
            canny_low,
            canny_high,
        })
    }

    /// Create an extractor with the default Canny thresholds
    pub fn with_sigma(sigma: f64) -> Result<Self> {
        let defaults = EdgeConfig::default();
        Self::new(sigma, defaults.canny_low, defaults.canny_high)
    }

    pub fn from_config(config: &EdgeConfig) -> Result<Self> {
        Self::new(config.sigma, config.canny_low, config.canny_high)
    }

    /// Same thresholds, different smoothing
    pub fn with_new_sigma(&self, sigma: f64) -> Result<Self> {
        Self::new(sigma, self.canny_low, self.canny_high)
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Extract edges inside `selection`, or the whole matrix when it is
    /// missing or empty
    ///
    /// A selection reaching outside the matrix is clamped. A selection
    /// covering no pixels yields an empty edge map rather than an error.
    pub fn extract(
        &self,
        matrix: &BrightnessMatrix,
        selection: Option<Rect>,
    ) -> Result<EdgeExtraction> {
        let bounds = matrix.selection_bounds(selection);
        let origin = bounds.origin();
        if bounds.is_empty() {
            debug!(?selection, "selection covers no pixels");
            return Ok(EdgeExtraction {
                edges: EdgeMap::default(),
                origin,
            });
        }

        let part = if bounds.width as usize == matrix.width()
            && bounds.height as usize == matrix.height()
        {
            matrix.to_mat()?
        } else {
            matrix.crop(bounds).to_mat()?
        };

        let smoothed = self.smooth(part)?;

        let mut edges = Mat::default();
        canny(
            &smoothed,
            &mut edges,
            self.canny_low,
            self.canny_high,
            CANNY_APERTURE,
            CANNY_L2_GRADIENT,
        )
        .map_err(|e| AnalysisError::opencv("Canny edge detection", e))?;

        let edges = EdgeMap::from_matrix(&BrightnessMatrix::from_mat(&edges)?);
        debug!(
            x = origin.x,
            y = origin.y,
            width = edges.width(),
            height = edges.height(),
            edge_pixels = edges.count(),
            "extracted edges"
        );
        Ok(EdgeExtraction { edges, origin })
    }

    fn smooth(&self, image: Mat) -> Result<Mat> {
        if self.sigma == 0.0 {
            return Ok(image);
        }
        let mut blurred = Mat::default();
        gaussian_blur(
            &image,
            &mut blurred,
            Size::new(0, 0),
            self.sigma,
            self.sigma,
            BORDER_REPLICATE,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| AnalysisError::opencv("Gaussian blur", e))?;
        Ok(blurred)
    }
}

/// Run edge detection on `rectangle` of `matrix` with smoothing `sigma`
///
/// Uses the default Canny thresholds.
pub fn extract_edges(
    matrix: &BrightnessMatrix,
    rectangle: Option<Rect>,
    sigma: f64,
) -> Result<EdgeExtraction> {
    check_sigma("sigma", sigma)?;
    EdgeExtractor::with_sigma(sigma)?.extract(matrix, rectangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_spot_image;

    #[test]
    fn test_edge_map_points_row_major() {
        let map = EdgeMap::from_fn(3, 2, |x, y| (x + y) % 2 == 0);
        assert_eq!(
            map.points(),
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(1, 1)]
        );
        assert_eq!(map.count(), 3);
        assert!(!map.is_empty());
        assert!(EdgeMap::default().is_empty());
    }

    #[test]
    fn test_rejects_negative_sigma() {
        let m = BrightnessMatrix::filled(8, 8, 0);
        assert!(extract_edges(&m, None, -1.0).is_err());
        assert!(EdgeExtractor::new(1.0, 200.0, 100.0).is_err());
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let m = BrightnessMatrix::filled(40, 30, 120);
        let result = extract_edges(&m, None, 1.0).unwrap();
        assert_eq!(result.origin, Point::new(0, 0));
        assert_eq!(result.edges.width(), 40);
        assert_eq!(result.edges.height(), 30);
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_spot_edges_surround_center() {
        let m = draw_spot_image(100, 100, [50.0, 50.0], 20.0, 200, 20);
        let result = extract_edges(&m, None, 1.0).unwrap();
        let points = result.edges.points();
        assert!(!points.is_empty());
        for p in points {
            let d = ((p.x as f64 - 50.0).powi(2) + (p.y as f64 - 50.0).powi(2)).sqrt();
            assert!((d - 20.0).abs() < 3.0, "edge at distance {}", d);
        }
    }

    #[test]
    fn test_faint_spot_is_found() {
        let m = draw_spot_image(100, 100, [50.0, 50.0], 20.0, 80, 40);
        let result = extract_edges(&m, None, 1.0).unwrap();
        let points = result.edges.points();
        assert!(!points.is_empty());
        for p in points {
            let d = ((p.x as f64 - 50.0).powi(2) + (p.y as f64 - 50.0).powi(2)).sqrt();
            assert!((d - 20.0).abs() < 3.0, "edge at distance {}", d);
        }
    }

    #[test]
    fn test_selection_sets_origin_and_shape() {
        let m = draw_spot_image(100, 100, [50.0, 50.0], 20.0, 200, 20);
        let result = extract_edges(&m, Some(Rect::new(20, 25, 60, 50)), 1.0).unwrap();
        assert_eq!(result.origin, Point::new(20, 25));
        assert_eq!(result.edges.width(), 60);
        assert_eq!(result.edges.height(), 50);
        assert!(!result.edges.is_empty());
    }

    #[test]
    fn test_selection_clamped_at_zero() {
        let m = BrightnessMatrix::filled(20, 20, 10);
        let result = extract_edges(&m, Some(Rect::new(-5, -3, 10, 10)), 0.0).unwrap();
        assert_eq!(result.origin, Point::new(0, 0));
        assert_eq!(result.edges.width(), 5);
        assert_eq!(result.edges.height(), 7);
    }

    #[test]
    fn test_extreme_selection_is_empty() {
        let m = BrightnessMatrix::filled(20, 20, 10);
        let result = extract_edges(&m, Some(Rect::new(i32::MAX - 5, 0, 10, 10)), 1.0).unwrap();
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_selection_outside_matrix_is_empty() {
        let m = BrightnessMatrix::filled(20, 20, 10);
        let result = extract_edges(&m, Some(Rect::new(30, 30, 5, 5)), 1.0).unwrap();
        assert!(result.edges.is_empty());
        assert_eq!(result.edges.width(), 0);
    }
}
