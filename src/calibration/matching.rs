//! Nearest-wavelength lookup in a calibration table

use super::table::{CalibrationRow, CalibrationTable};
use crate::constants::calibration::DEFAULT_FILTER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Mapping from a filename turn token to the calibration blocks measured at
/// that turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupFilter(BTreeMap<i32, Vec<usize>>);

impl Default for GroupFilter {
    fn default() -> Self {
        Self(
            DEFAULT_FILTER
                .iter()
                .map(|(key, blocks)| (*key, blocks.to_vec()))
                .collect(),
        )
    }
}

impl GroupFilter {
    /// Filter without any group
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn blocks_for(&self, key: i32) -> Option<&[usize]> {
        self.0.get(&key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: i32, blocks: Vec<usize>) -> Option<Vec<usize>> {
        self.0.insert(key, blocks)
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.keys().copied()
    }
}

/// Calibration values found for a requested wavelength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMatch {
    /// Measured peak wavelength of the matched row
    pub wavelength: f64,
    pub fwhm: String,
    pub exposure: String,
    pub brightness: String,
    pub gain: String,
    pub polarization: String,
    /// Matched row as stored in the table
    pub row: CalibrationRow,
}

impl CalibrationMatch {
    fn from_row(wavelength: f64, row: &CalibrationRow) -> Self {
        Self {
            wavelength,
            fwhm: row.fwhm().to_string(),
            exposure: row.exposure().to_string(),
            brightness: row.brightness().to_string(),
            gain: row.gain().to_string(),
            polarization: row.polarization().to_string(),
            row: row.clone(),
        }
    }
}

/// Find the row whose peak wavelength is closest to `target`
///
/// The rows of every block `filter` lists for `group_key` are searched in
/// order; ties go to the earlier row. Rows with an unreadable peak are
/// skipped. Returns `None` for an unknown group, a block index outside the
/// table, or when no row has a readable peak.
pub fn match_wavelength(
    table: &CalibrationTable,
    filter: &GroupFilter,
    group_key: i32,
    target: f64,
) -> Option<CalibrationMatch> {
    if !target.is_finite() {
        return None;
    }
    let indices = filter.blocks_for(group_key)?;
    let blocks = indices
        .iter()
        .map(|&i| table.block(i))
        .collect::<Option<Vec<_>>>()?;

    let mut skipped = 0usize;
    let mut best: Option<(f64, f64, &CalibrationRow)> = None;
    for row in blocks.iter().flat_map(|b| b.rows()) {
        let Some(peak) = row.peak_value() else {
            skipped += 1;
            continue;
        };
        let distance = (peak - target).abs();
        if best.map_or(true, |(d, _, _)| distance < d) {
            best = Some((distance, peak, row));
        }
    }

    if skipped > 0 {
        warn!(group_key, skipped, "calibration rows without a readable peak");
    }
    best.map(|(_, peak, row)| CalibrationMatch::from_row(peak, row))
}
