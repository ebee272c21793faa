//! File name parsing and acquisition info
//!
//! Image stems start with the nominal wavelength and the turn of the
//! polarizer, e.g. `650nm_45_0.5_2`. Everything after the second token is
//! ignored here.

use crate::calibration::{match_wavelength, CalibrationMatch, CalibrationTable, GroupFilter};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Values encoded in an image file name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilenameInfo {
    /// Nominal peak wavelength in nm
    pub wavelength: f64,
    /// Calibration group key, 0 when the name carries none
    pub turn: i32,
}

impl FilenameInfo {
    /// Parse a file stem
    ///
    /// The first `_` token up to its first `n` is the wavelength (`650nm`,
    /// `650.5`). The second token is the turn when it is an integer.
    /// Returns `None` when the wavelength cannot be read.
    pub fn parse(stem: &str) -> Option<Self> {
        let mut tokens = stem.split('_');
        let wavelength = tokens
            .next()?
            .split('n')
            .next()?
            .trim()
            .parse::<f64>()
            .ok()?;
        let turn = tokens
            .next()
            .and_then(|t| t.trim().parse::<i32>().ok())
            .unwrap_or(0);
        Some(Self { wavelength, turn })
    }

    /// Parse the stem of `path`
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::parse(path.file_stem()?.to_str()?)
    }
}

/// Acquisition parameters of one image, as displayed and recorded
///
/// Fields are kept as text: calibration files store them that way and
/// background matching compares them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    pub wavelength: Option<String>,
    /// Reflectivity in percent
    pub reflectivity: Option<String>,
    pub fwhm: Option<String>,
    pub exposure: Option<String>,
    pub brightness: Option<String>,
    pub gain: Option<String>,
    pub polarization: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn with_unit(value: &Option<String>, unit: &str) -> String {
    value
        .as_deref()
        .map(|v| format!("{}{}", v, unit))
        .unwrap_or_default()
}

impl AcquisitionInfo {
    /// Info holding only the nominal wavelength
    pub fn from_filename(info: &FilenameInfo) -> Self {
        Self {
            wavelength: Some(format!("{:.3}", info.wavelength)),
            ..Self::default()
        }
    }

    /// Parse `stem` and, when a table is given, enrich the result with the
    /// closest calibration record of its group
    pub fn resolve(stem: &str, calibration: Option<&CalibrationTable>, filter: &GroupFilter) -> Self {
        let Some(parsed) = FilenameInfo::parse(stem) else {
            debug!(stem, "file name carries no wavelength");
            return Self::default();
        };
        let mut info = Self::from_filename(&parsed);
        if let Some(found) = calibration
            .and_then(|table| match_wavelength(table, filter, parsed.turn, parsed.wavelength))
        {
            info.apply_calibration(&found);
        }
        info
    }

    /// Replace the nominal wavelength by the measured one and fill in the
    /// recorded acquisition settings
    pub fn apply_calibration(&mut self, found: &CalibrationMatch) {
        self.wavelength = Some(format!("{:.3}", found.wavelength));
        self.fwhm = non_empty(&found.fwhm);
        self.exposure = non_empty(&found.exposure);
        self.brightness = non_empty(&found.brightness);
        self.gain = non_empty(&found.gain);
        self.polarization = non_empty(&found.polarization);
    }

    /// Store a reflectivity ratio as a percentage; zero or missing clears it
    pub fn set_reflectivity(&mut self, ratio: Option<f64>) {
        self.reflectivity = ratio
            .filter(|r| *r != 0.0)
            .map(|r| format!("{:.2}", 100.0 * r));
    }

    /// Whether the image can be added to a results table
    pub fn is_recordable(&self) -> bool {
        self.wavelength.is_some() && self.reflectivity.is_some()
    }

    /// Seven-line text panel, labels right-aligned
    pub fn describe(&self) -> String {
        let plain = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            format!("  wavelength: {}", with_unit(&self.wavelength, " nm")),
            format!("reflectivity: {}", with_unit(&self.reflectivity, "%")),
            format!("        FWHM: {}", with_unit(&self.fwhm, " nm")),
            format!("    exposure: {}", with_unit(&self.exposure, " s")),
            format!("  brightness: {}", plain(&self.brightness)),
            format!("        gain: {}", plain(&self.gain)),
            format!("polarization: {}", plain(&self.polarization)),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{build_table, normalize};

    #[test]
    fn test_parse_wavelength_and_turn() {
        assert_eq!(
            FilenameInfo::parse("650nm_45_0.5_2"),
            Some(FilenameInfo { wavelength: 650.0, turn: 45 })
        );
        assert_eq!(
            FilenameInfo::parse("650.5nm"),
            Some(FilenameInfo { wavelength: 650.5, turn: 0 })
        );
        assert_eq!(
            FilenameInfo::parse("700_x"),
            Some(FilenameInfo { wavelength: 700.0, turn: 0 })
        );
        assert_eq!(FilenameInfo::parse("background_1_2"), None);
        assert_eq!(FilenameInfo::parse(""), None);
    }

    #[test]
    fn test_from_path_uses_stem() {
        let info = FilenameInfo::from_path(Path::new("/data/run/652nm_90.png")).unwrap();
        assert_eq!(info.wavelength, 652.0);
        assert_eq!(info.turn, 90);
    }

    #[test]
    fn test_resolve_without_calibration() {
        let info = AcquisitionInfo::resolve("650nm_45", None, &GroupFilter::default());
        assert_eq!(info.wavelength.as_deref(), Some("650.000"));
        assert!(info.fwhm.is_none());
        assert!(!info.is_recordable());
    }

    #[test]
    fn test_resolve_with_calibration() {
        let table = normalize(build_table(vec![
            vec!["650", "650.2", "10", "0.5", "5", "2", "s"],
            vec!["sep"],
            vec!["650", "649.7", "11", "0.25", "6", "", "p"],
        ]));
        let info = AcquisitionInfo::resolve("650nm_45", Some(&table), &GroupFilter::default());
        assert_eq!(info.wavelength.as_deref(), Some("649.700"));
        assert_eq!(info.fwhm.as_deref(), Some("11"));
        assert_eq!(info.exposure.as_deref(), Some("0.25"));
        assert_eq!(info.gain.as_deref(), Some("2"));
        assert_eq!(info.polarization.as_deref(), Some("p"));

        // Unknown group keeps the nominal wavelength
        let info = AcquisitionInfo::resolve("650nm_30", Some(&table), &GroupFilter::default());
        assert_eq!(info.wavelength.as_deref(), Some("650.000"));
        assert!(info.polarization.is_none());
    }

    #[test]
    fn test_set_reflectivity() {
        let mut info = AcquisitionInfo::default();
        info.set_reflectivity(Some(0.123456));
        assert_eq!(info.reflectivity.as_deref(), Some("12.35"));
        info.set_reflectivity(Some(0.0));
        assert!(info.reflectivity.is_none());
        info.set_reflectivity(None);
        assert!(info.reflectivity.is_none());
    }

    #[test]
    fn test_describe() {
        let mut info = AcquisitionInfo::from_filename(&FilenameInfo {
            wavelength: 650.0,
            turn: 0,
        });
        info.set_reflectivity(Some(0.5));
        info.exposure = Some("0.5".to_string());
        let text = info.describe();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "  wavelength: 650.000 nm");
        assert_eq!(lines[1], "reflectivity: 50.00%");
        assert_eq!(lines[2], "        FWHM: ");
        assert_eq!(lines[3], "    exposure: 0.5 s");
        assert_eq!(lines[6], "polarization: ");
        assert!(info.is_recordable());
    }
}
