//! Default tunables and fixed values for reflectivity analysis
//!
//! The defaults reproduce the values the measurement setup has been run with.
//! Every value here can be overridden through [`crate::config::AnalysisConfig`].

/// Value reported for an invalid region at serialization boundaries
pub const SENTINEL_INVALID: f64 = -1.0;

/// Edge extraction parameters
pub mod edges {
    /// Gaussian smoothing sigma applied before edge detection
    pub const SIGMA: f64 = 1.0;

    /// Largest sigma offered to interactive users
    pub const MAX_SIGMA: f64 = 10.0;

    /// Canny hysteresis thresholds: 10% and 20% of the 8-bit range
    pub const CANNY_LOW_THRESHOLD: f64 = 25.5;
    pub const CANNY_HIGH_THRESHOLD: f64 = 51.0;

    /// Sobel aperture used by Canny
    pub const CANNY_APERTURE: i32 = 3;

    /// Gradient magnitude as the Euclidean norm rather than |gx| + |gy|
    pub const CANNY_L2_GRADIENT: bool = true;
}

/// Inner (bright spot) shrink-search parameters
pub mod inner {
    /// Maximum standard deviation of an accepted inner block
    pub const STD_TARGET: f64 = 10.0;

    /// Scale applied to the block half-width after a rejected block
    pub const SHRINK_FACTOR: f64 = 0.9;
}

/// Outer (background) grow-search parameters
pub mod outer {
    /// Maximum standard deviation of an accepted background block
    pub const STD_TARGET: f64 = 3.0;

    /// Scale applied to the block half-width after an accepted block
    pub const GROW_FACTOR: f64 = 1.1;

    /// Sector count used by the full analysis
    pub const SECTORS: usize = 10;

    /// Sector count when none is specified
    pub const DEFAULT_SECTORS: usize = 4;

    /// Distance of sector boxes from the centroid, in units of `d_max`
    pub const CENTER_DISTANCE_RATIO: f64 = 1.2;
}

/// Hough transform parameters for line detection
pub mod hough {
    /// Distance resolution in pixels
    pub const RHO: f64 = 1.0;

    /// Angle resolution in radians
    pub const THETA: f64 = std::f64::consts::PI / 180.0;

    /// Votes a standard transform peak needs before the relative test
    pub const THRESHOLD: i32 = 10;

    /// Standard transform peaks weaker than this share of the strongest
    /// peak are dropped
    pub const PEAK_RATIO: f64 = 0.5;

    /// Accumulator votes required by the probabilistic transform
    pub const PROBABILISTIC_THRESHOLD: i32 = 50;

    /// Minimum segment length at 100% zoom
    pub const LINE_LENGTH: f64 = 80.0;

    /// Maximum gap bridged inside a segment at 100% zoom
    pub const LINE_GAP: f64 = 5.0;

    /// Peak suppression neighbourhood: distance in pixels
    pub const PEAK_MIN_DISTANCE: f64 = 9.0;

    /// Peak suppression neighbourhood: angle in radians (10 degrees)
    pub const PEAK_MIN_ANGLE: f64 = 10.0 * std::f64::consts::PI / 180.0;
}

/// Calibration file layout
pub mod calibration {
    /// Fields per calibration row
    pub const FIELD_COUNT: usize = 7;

    /// Column holding the nominal wavelength
    pub const WAVELENGTH: usize = 0;
    /// Column holding the measured (corrected) peak wavelength
    pub const PEAK: usize = 1;
    pub const FWHM: usize = 2;
    pub const EXPOSURE: usize = 3;
    pub const BRIGHTNESS: usize = 4;
    pub const GAIN: usize = 5;
    pub const POLARIZATION: usize = 6;

    /// Default mapping from filename turn token to block indices
    pub const DEFAULT_FILTER: [(i32, &[usize]); 4] =
        [(0, &[0]), (45, &[1]), (90, &[2]), (135, &[3])];
}

/// Export table layout
pub mod export {
    /// Column separator used in exported text tables
    pub const SEPARATOR: &str = "    ";

    /// Column headers of exported text tables
    pub const HEADER: [&str; 4] = ["wavelength[nm]", "reflectivity[%]", "polarization", "FWHM[nm]"];

    /// Placeholder for missing polarization or FWHM
    pub const UNKNOWN: &str = "unknown";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_factors_terminate() {
        // Shrink must shrink and grow must grow, otherwise searches never end
        assert!(inner::SHRINK_FACTOR > 0.0 && inner::SHRINK_FACTOR < 1.0);
        assert!(outer::GROW_FACTOR > 1.0);
        assert!(outer::SECTORS > 0 && outer::DEFAULT_SECTORS > 0);
    }

    #[test]
    fn test_canny_thresholds_ordered() {
        assert!(edges::CANNY_LOW_THRESHOLD < edges::CANNY_HIGH_THRESHOLD);
        assert!(edges::SIGMA <= edges::MAX_SIGMA);
    }

    #[test]
    fn test_calibration_columns_in_range() {
        for col in [
            calibration::WAVELENGTH,
            calibration::PEAK,
            calibration::FWHM,
            calibration::EXPOSURE,
            calibration::BRIGHTNESS,
            calibration::GAIN,
            calibration::POLARIZATION,
        ] {
            assert!(col < calibration::FIELD_COUNT);
        }
    }
}
