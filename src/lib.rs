//! # Ring Reflectivity
//!
//! A Rust crate for measuring the reflectivity of ring-shaped reflection
//! patterns in grayscale images.
//!
//! This library provides the measurement core by:
//! - Locating the pattern from Canny edges of a selection
//! - Sampling a homogeneous block on the bright central spot
//! - Sampling homogeneous background blocks in angular sectors around it
//! - Detecting straight fringes with standard or probabilistic Hough transforms
//! - Reconciling sparse calibration records with the imaged wavelength
//!
//! ## Example
//!
//! ```rust,no_run
//! use ring_reflectivity::{AnalysisConfig, BrightnessMatrix, ReflectivityAnalyzer};
//!
//! let matrix = BrightnessMatrix::filled(640, 480, 0);
//! let analyzer = ReflectivityAnalyzer::new(AnalysisConfig::default())?;
//! let analysis = analyzer.analyze(&matrix, None)?;
//! if let Some(r) = analysis.reflectivity {
//!     println!("reflectivity: {:.2}%", 100.0 * r);
//! }
//! # Ok::<(), ring_reflectivity::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod calibration;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod matrix;
pub mod measurement;
pub mod metadata;
pub mod report;

#[cfg(test)]
mod test_utils;

pub use calibration::{CalibrationCache, CalibrationMatch, CalibrationTable, GroupFilter};
pub use config::AnalysisConfig;
pub use detection::{Centroid, EdgeExtractor, LineDetectionMode, LineSegment, RadiusPair};
pub use error::{AnalysisError, Result};
pub use matrix::{BrightnessMatrix, Point, Rect, RegionStatistics};
pub use measurement::{compute_reflectivity, RegionMeasurement};
pub use metadata::{AcquisitionInfo, FilenameInfo};
pub use report::{MeasurementSettings, ReflectivityRecord, ResultsTable};

use detection::{estimate_shape, LineDetector};
use measurement::{InnerRegionOptimizer, OuterRegionOptimizer};

/// Outcome of one pattern analysis
///
/// When no edge pixel is found, only `origin` is set and every measurement
/// is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Top-left corner of the analysed selection in matrix coordinates
    pub origin: Point,
    /// Edge pixels in matrix coordinates
    pub edge_points: Vec<Point>,
    /// Pattern center relative to `origin`
    pub centroid: Option<Centroid>,
    pub radii: Option<RadiusPair>,
    pub inner: Option<RegionMeasurement>,
    /// One entry per sector
    pub outer: Vec<RegionMeasurement>,
    /// Unscaled inner to background ratio
    pub reflectivity: Option<f64>,
}

impl Analysis {
    fn without_pattern(origin: Point) -> Self {
        Self {
            origin,
            edge_points: Vec::new(),
            centroid: None,
            radii: None,
            inner: None,
            outer: Vec::new(),
            reflectivity: None,
        }
    }

    /// Whether an edge pattern was found at all
    pub fn found_pattern(&self) -> bool {
        self.centroid.is_some()
    }

    /// Reflectivity in percent
    pub fn reflectivity_percent(&self) -> Option<f64> {
        self.reflectivity.map(|r| 100.0 * r)
    }
}

/// Measurement pipeline configured once and applied to many images
///
/// Holds no per-image state, so one analyzer may serve concurrent callers.
#[derive(Debug, Clone)]
pub struct ReflectivityAnalyzer {
    config: AnalysisConfig,
    edges: EdgeExtractor,
    line_edges: EdgeExtractor,
    lines: LineDetector,
    inner: InnerRegionOptimizer,
    outer: OuterRegionOptimizer,
}

impl ReflectivityAnalyzer {
    /// Build the pipeline stages from `config`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` for any setting that would
    /// make a search diverge or a detector meaningless.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let edges = EdgeExtractor::from_config(&config.edges)?;
        let line_edges = edges.with_new_sigma(config.lines.sigma)?;
        let lines = LineDetector::from_config(&config.lines)?;
        let inner = InnerRegionOptimizer::from_config(&config.inner)?;
        let outer = OuterRegionOptimizer::from_config(&config.outer)?;
        Ok(Self {
            config,
            edges,
            line_edges,
            lines,
            inner,
            outer,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Matrix to analyse: background-subtracted when enabled and available
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DimensionMismatch` if the background frame
    /// has a different size.
    pub fn prepare(
        &self,
        matrix: &BrightnessMatrix,
        background: Option<&BrightnessMatrix>,
    ) -> Result<BrightnessMatrix> {
        match background {
            Some(bg) if self.config.subtract_background => {
                debug!("subtracting background frame");
                matrix.subtract_background(bg)
            }
            _ => Ok(matrix.clone()),
        }
    }

    /// Locate the pattern in `selection` and measure its reflectivity
    ///
    /// A missing or empty selection analyses the whole matrix.
    pub fn analyze(&self, matrix: &BrightnessMatrix, selection: Option<Rect>) -> Result<Analysis> {
        let extraction = self.edges.extract(matrix, selection)?;
        let origin = extraction.origin;

        let Some(shape) = estimate_shape(&extraction.edges) else {
            info!(?selection, "no pattern found");
            return Ok(Analysis::without_pattern(origin));
        };

        let inner = self
            .inner
            .optimize(matrix, origin, shape.centroid, shape.radii.d_min)?;
        let outer = self
            .outer
            .optimize(matrix, origin, shape.centroid, shape.radii.d_max)?;
        let reflectivity = compute_reflectivity(&inner, &outer);

        info!(
            edge_points = shape.points.len(),
            d_min = shape.radii.d_min,
            d_max = shape.radii.d_max,
            inner = ?inner.brightness,
            valid_sectors = outer.iter().filter(|r| r.is_valid()).count(),
            ?reflectivity,
            "analysis complete"
        );

        Ok(Analysis {
            origin,
            edge_points: shape.points_in_frame(origin),
            centroid: Some(shape.centroid),
            radii: Some(shape.radii),
            inner: Some(inner),
            outer,
            reflectivity,
        })
    }

    /// Straight fringes in `selection`, in matrix coordinates
    ///
    /// `scale_factor` is the display zoom the probabilistic detector adapts
    /// its length and gap limits to.
    pub fn detect_lines(
        &self,
        matrix: &BrightnessMatrix,
        selection: Option<Rect>,
        scale_factor: f64,
    ) -> Result<Vec<LineSegment>> {
        let extraction = self.line_edges.extract(matrix, selection)?;
        self.lines
            .detect(&extraction.edges, extraction.origin, scale_factor)
    }

    /// Inputs of an analysis of `selection` at display zoom `scale_factor`
    pub fn settings(&self, selection: Option<Rect>, scale_factor: f64) -> MeasurementSettings {
        MeasurementSettings::from_config(&self.config, selection, scale_factor)
    }

    /// Run a recorded measurement again on `matrix`
    ///
    /// The recorded sigmas and background switch replace those of this
    /// analyzer; every other tunable is kept.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the recorded settings
    /// are unusable, and any error of [`prepare`](Self::prepare) or
    /// [`analyze`](Self::analyze).
    pub fn replay(
        &self,
        settings: &MeasurementSettings,
        matrix: &BrightnessMatrix,
        background: Option<&BrightnessMatrix>,
    ) -> Result<Analysis> {
        debug!(image = ?settings.image, selection = ?settings.selection, "replaying measurement");
        let analyzer = Self::new(settings.apply_to(&self.config))?;
        let prepared = analyzer.prepare(matrix, background)?;
        analyzer.analyze(&prepared, settings.selection)
    }

    /// Brightness summary of `selection`, or of the whole matrix
    pub fn selection_statistics(
        &self,
        matrix: &BrightnessMatrix,
        selection: Option<Rect>,
    ) -> Option<RegionStatistics> {
        matrix.statistics(selection)
    }

    /// Acquisition info for an image stem, calibrated when enabled
    pub fn acquisition_info(
        &self,
        stem: &str,
        calibration: Option<&CalibrationTable>,
    ) -> AcquisitionInfo {
        let calibration = calibration.filter(|_| self.config.apply_calibration);
        AcquisitionInfo::resolve(stem, calibration, &self.config.calibration.filter)
    }
}
