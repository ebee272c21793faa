//! Acquisition metadata module
//!
//! Measurement images carry their acquisition parameters in the file name.
//! This module parses those names, merges them with calibration records, and
//! pairs images with the background frames taken under the same settings.

pub mod background;
pub mod filename;

pub use background::{background_file_name, find_background_files, is_background_file};
pub use filename::{AcquisitionInfo, FilenameInfo};
