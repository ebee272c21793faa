//! Configuration structures for the reflectivity analysis pipeline.
//!
//! Every tunable of the analysis lives here, grouped by pipeline stage.
//! Switches that an interactive front end would keep as checkbox state
//! (background subtraction, calibration) are plain fields, so each call
//! receives the complete set of inputs explicitly.
//!
//! # Configuration Loading
//!
//! ```no_run
//! use ring_reflectivity::AnalysisConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = AnalysisConfig::from_json_file(Path::new("analysis.json"))?;
//!
//! // Or use defaults
//! let config = AnalysisConfig::default();
//! config.validate()?;
//! # Ok::<(), ring_reflectivity::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`EdgeConfig`]: smoothing and Canny thresholds for pattern location
//! - [`LineConfig`]: smoothing and Hough parameters for fringe detection
//! - [`InnerRegionConfig`]: shrink-search of the bright central spot
//! - [`OuterRegionConfig`]: grow-search of the background sectors
//! - [`CalibrationConfig`]: turn-to-block mapping for calibration lookup

use crate::calibration::GroupFilter;
use crate::constants::{edges, hough, inner, outer};
use crate::detection::LineDetectionMode;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Edge extraction for pattern location
    pub edges: EdgeConfig,

    /// Straight fringe detection
    pub lines: LineConfig,

    /// Inner region shrink-search
    pub inner: InnerRegionConfig,

    /// Outer region grow-search
    pub outer: OuterRegionConfig,

    /// Calibration lookup
    pub calibration: CalibrationConfig,

    /// Subtract the matching background frame before analysis
    #[serde(default)]
    pub subtract_background: bool,

    /// Enrich acquisition info from the calibration table
    #[serde(default = "default_true")]
    pub apply_calibration: bool,
}

fn default_true() -> bool {
    true
}

/// Edge extraction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Gaussian smoothing sigma (0 disables smoothing)
    pub sigma: f64,

    /// Canny hysteresis low threshold
    pub canny_low: f64,

    /// Canny hysteresis high threshold
    pub canny_high: f64,
}

/// Line detection parameters.
///
/// Uses its own smoothing sigma; the Canny thresholds are shared with
/// [`EdgeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Gaussian smoothing sigma for the line edge map
    pub sigma: f64,

    /// Standard or probabilistic Hough transform
    pub mode: LineDetectionMode,

    /// Votes a standard transform peak needs before the relative test
    pub threshold: i32,

    /// Standard transform peaks need at least this share of the strongest
    /// peak's votes
    pub peak_ratio: f64,

    /// Votes required by the probabilistic transform
    pub probabilistic_threshold: i32,

    /// Minimum segment length at 100% zoom
    pub line_length: f64,

    /// Maximum bridged gap at 100% zoom
    pub line_gap: f64,

    /// Weaker peaks closer than this distance to a stronger one are dropped
    pub peak_min_distance: f64,

    /// Weaker peaks closer than this angle (radians) to a stronger one are dropped
    pub peak_min_angle: f64,
}

/// Inner region shrink-search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InnerRegionConfig {
    /// Maximum standard deviation of an accepted block
    pub std_target: f64,

    /// Half-width scale after a rejected block, in (0, 1)
    pub shrink_factor: f64,
}

/// Outer region grow-search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OuterRegionConfig {
    /// Maximum standard deviation of an accepted block
    pub std_target: f64,

    /// Half-width scale after an accepted block, > 1
    pub grow_factor: f64,

    /// Number of angular sectors
    pub sectors: usize,
}

/// Calibration lookup parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalibrationConfig {
    /// Filename turn token to calibration block indices
    #[serde(default)]
    pub filter: GroupFilter,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            sigma: edges::SIGMA,
            canny_low: edges::CANNY_LOW_THRESHOLD,
            canny_high: edges::CANNY_HIGH_THRESHOLD,
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            sigma: edges::SIGMA,
            mode: LineDetectionMode::Standard,
            threshold: hough::THRESHOLD,
            peak_ratio: hough::PEAK_RATIO,
            probabilistic_threshold: hough::PROBABILISTIC_THRESHOLD,
            line_length: hough::LINE_LENGTH,
            line_gap: hough::LINE_GAP,
            peak_min_distance: hough::PEAK_MIN_DISTANCE,
            peak_min_angle: hough::PEAK_MIN_ANGLE,
        }
    }
}

impl Default for InnerRegionConfig {
    fn default() -> Self {
        Self {
            std_target: inner::STD_TARGET,
            shrink_factor: inner::SHRINK_FACTOR,
        }
    }
}

impl Default for OuterRegionConfig {
    fn default() -> Self {
        Self {
            std_target: outer::STD_TARGET,
            grow_factor: outer::GROW_FACTOR,
            sectors: outer::SECTORS,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            edges: EdgeConfig::default(),
            lines: LineConfig::default(),
            inner: InnerRegionConfig::default(),
            outer: OuterRegionConfig::default(),
            calibration: CalibrationConfig::default(),
            subtract_background: false,
            apply_calibration: true,
        }
    }
}

/// Reject a sigma that is negative or not finite
pub(crate) fn check_sigma(parameter: &str, sigma: f64) -> Result<()> {
    if sigma.is_finite() && sigma >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(parameter, sigma))
    }
}

/// Reject a homogeneity threshold that is negative or NaN
pub(crate) fn check_std_target(parameter: &str, std_target: f64) -> Result<()> {
    if std_target >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(parameter, std_target))
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<()> {
        check_sigma("edges.sigma", self.sigma)?;
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(AnalysisError::invalid_parameter(
                "edges.canny_low",
                format!("{} (high = {})", self.canny_low, self.canny_high),
            ));
        }
        Ok(())
    }
}

impl LineConfig {
    pub fn validate(&self) -> Result<()> {
        check_sigma("lines.sigma", self.sigma)?;
        if self.threshold <= 0 {
            return Err(AnalysisError::invalid_parameter("lines.threshold", self.threshold));
        }
        if !(0.0..=1.0).contains(&self.peak_ratio) {
            return Err(AnalysisError::invalid_parameter("lines.peak_ratio", self.peak_ratio));
        }
        if self.probabilistic_threshold <= 0 {
            return Err(AnalysisError::invalid_parameter(
                "lines.probabilistic_threshold",
                self.probabilistic_threshold,
            ));
        }
        if !(self.line_length >= 0.0) {
            return Err(AnalysisError::invalid_parameter("lines.line_length", self.line_length));
        }
        if !(self.line_gap >= 0.0) {
            return Err(AnalysisError::invalid_parameter("lines.line_gap", self.line_gap));
        }
        if !(self.peak_min_distance >= 0.0 && self.peak_min_angle >= 0.0) {
            return Err(AnalysisError::invalid_parameter(
                "lines.peak_min_distance/peak_min_angle",
                format!("{}/{}", self.peak_min_distance, self.peak_min_angle),
            ));
        }
        Ok(())
    }
}

impl InnerRegionConfig {
    pub fn validate(&self) -> Result<()> {
        check_std_target("inner.std_target", self.std_target)?;
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(AnalysisError::invalid_parameter(
                "inner.shrink_factor",
                self.shrink_factor,
            ));
        }
        Ok(())
    }
}

impl OuterRegionConfig {
    pub fn validate(&self) -> Result<()> {
        check_std_target("outer.std_target", self.std_target)?;
        if !(self.grow_factor > 1.0 && self.grow_factor.is_finite()) {
            return Err(AnalysisError::invalid_parameter("outer.grow_factor", self.grow_factor));
        }
        if self.sectors == 0 {
            return Err(AnalysisError::invalid_parameter("outer.sectors", self.sectors));
        }
        Ok(())
    }
}

impl AnalysisConfig {
    /// Check every section, failing on the first unusable value
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.edges.validate()?;
        self.lines.validate()?;
        self.inner.validate()?;
        self.outer.validate()?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::config(format!("cannot read {}", path.display()), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AnalysisError::config(format!("cannot parse {}", path.display()), e))?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("cannot serialize configuration", e))?;
        std::fs::write(path, json)
            .map_err(|e| AnalysisError::config(format!("cannot write {}", path.display()), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.outer.sectors, 10);
        assert_eq!(config.inner.shrink_factor, 0.9);
        assert_eq!(config.outer.grow_factor, 1.1);
        assert_eq!(config.calibration.filter.blocks_for(45), Some(&[1usize][..]));
    }

    #[test]
    fn test_rejects_peak_ratio_out_of_range() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.lines.peak_ratio, 0.5);
        config.lines.peak_ratio = 1.5;
        assert!(config.validate().is_err());
        config.lines.peak_ratio = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_terminating_factors() {
        let mut config = AnalysisConfig::default();
        config.inner.shrink_factor = 1.0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidParameter { .. })
        ));

        let mut config = AnalysisConfig::default();
        config.outer.grow_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.outer.sectors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_sigma() {
        let mut config = AnalysisConfig::default();
        config.lines.sigma = -0.5;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.edges.sigma = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = AnalysisConfig::default();
        config.lines.mode = LineDetectionMode::Probabilistic;
        config.subtract_background = true;

        let path = std::env::temp_dir().join(format!(
            "ring_reflectivity_config_{}.json",
            std::process::id()
        ));
        config.to_json_file(&path).unwrap();
        let loaded = AnalysisConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AnalysisConfig::from_json_file(Path::new("/nonexistent/analysis.json"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigError { .. }));
    }
}
