//! Calibration record reconciliation module
//!
//! This module reads calibration files, fills in the cells left empty by the
//! operator, and looks up the calibration values recorded closest to a
//! requested wavelength.

pub mod cache;
pub mod matching;
pub mod table;

pub use cache::CalibrationCache;
pub use matching::{match_wavelength, CalibrationMatch, GroupFilter};
pub use table::{build_table, normalize, CalibrationBlock, CalibrationRow, CalibrationTable};
