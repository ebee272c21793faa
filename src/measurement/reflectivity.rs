//! Ratio of spot brightness to surrounding background brightness

use super::RegionMeasurement;

/// Reflectivity as `inner / mean(valid outer)`
///
/// Outer sectors without a brightness are ignored. Returns `None` when the
/// inner region is invalid, when no outer sector is valid, or when the
/// background mean is not positive. The ratio is unscaled; multiply by 100
/// for a percentage.
pub fn compute_reflectivity(inner: &RegionMeasurement, outer: &[RegionMeasurement]) -> Option<f64> {
    let inner = inner.brightness.filter(|b| *b >= 0.0)?;

    let (sum, count) = outer
        .iter()
        .filter_map(|region| region.brightness)
        .filter(|b| *b >= 0.0)
        .fold((0.0, 0usize), |(sum, count), b| (sum + b, count + 1));
    if count == 0 {
        return None;
    }

    let background = sum / count as f64;
    (background > 0.0).then(|| inner / background)
}
