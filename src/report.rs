//! Collected reflectivity results and their text export

use crate::config::AnalysisConfig;
use crate::constants::export::{HEADER, SEPARATOR, UNKNOWN};
use crate::matrix::Rect;
use crate::metadata::AcquisitionInfo;
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Inputs a measurement was taken with, enough to run it again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSettings {
    /// Measured image file
    pub image: Option<PathBuf>,
    /// Display zoom at measurement time
    pub scale_factor: f64,
    /// Analysed selection, `None` for the whole image
    pub selection: Option<Rect>,
    pub edge_sigma: f64,
    pub line_sigma: f64,
    pub subtract_background: bool,
}

impl MeasurementSettings {
    /// Settings of an analysis run with `config`
    pub fn from_config(config: &AnalysisConfig, selection: Option<Rect>, scale_factor: f64) -> Self {
        Self {
            image: None,
            scale_factor,
            selection,
            edge_sigma: config.edges.sigma,
            line_sigma: config.lines.sigma,
            subtract_background: config.subtract_background,
        }
    }

    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// `base` with the recorded sigmas and background switch restored
    pub fn apply_to(&self, base: &AnalysisConfig) -> AnalysisConfig {
        let mut config = base.clone();
        config.edges.sigma = self.edge_sigma;
        config.lines.sigma = self.line_sigma;
        config.subtract_background = self.subtract_background;
        config
    }
}

/// One measured image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectivityRecord {
    /// Wavelength in nm
    pub wavelength: f64,
    /// Reflectivity in percent
    pub reflectivity: f64,
    pub polarization: Option<String>,
    /// Peak FWHM in nm, kept as recorded
    pub fwhm: Option<String>,
    #[serde(default)]
    pub settings: Option<MeasurementSettings>,
}

impl ReflectivityRecord {
    pub fn new(wavelength: f64, reflectivity: f64) -> Self {
        Self {
            wavelength,
            reflectivity,
            polarization: None,
            fwhm: None,
            settings: None,
        }
    }

    pub fn with_settings(mut self, settings: MeasurementSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Record built from displayed acquisition info
    ///
    /// Returns `None` unless both wavelength and reflectivity are present
    /// and numeric.
    pub fn from_info(info: &AcquisitionInfo) -> Option<Self> {
        let wavelength = info.wavelength.as_deref()?.trim().parse().ok()?;
        let reflectivity = info.reflectivity.as_deref()?.trim().parse().ok()?;
        Some(Self {
            wavelength,
            reflectivity,
            polarization: info.polarization.clone(),
            fwhm: info.fwhm.clone(),
            settings: None,
        })
    }

    /// Polarization label, `unknown` when missing
    pub fn polarization_label(&self) -> &str {
        self.polarization.as_deref().unwrap_or(UNKNOWN)
    }

    fn to_line(&self) -> String {
        [
            format!("{:.3}", self.wavelength),
            format!("{:.2}", self.reflectivity),
            self.polarization_label().to_string(),
            self.fwhm.as_deref().unwrap_or(UNKNOWN).to_string(),
        ]
        .join(SEPARATOR)
    }
}

/// Ordered collection of measured images
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    records: Vec<ReflectivityRecord>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ReflectivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: ReflectivityRecord) {
        self.records.push(record);
    }

    /// Overwrite wavelength and reflectivity of row `index`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if `index` is out of range.
    pub fn replace(&mut self, index: usize, wavelength: f64, reflectivity: f64) -> Result<()> {
        let record = self
            .records
            .get_mut(index)
            .ok_or_else(|| AnalysisError::invalid_parameter("index", index))?;
        record.wavelength = wavelength;
        record.reflectivity = reflectivity;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<ReflectivityRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    /// `(wavelength, reflectivity)` pairs in increasing wavelength
    pub fn sorted_by_wavelength(&self) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> = self
            .records
            .iter()
            .map(|r| (r.wavelength, r.reflectivity))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points
    }

    /// Sorted `(wavelength, reflectivity)` pairs per polarization label
    pub fn by_polarization(&self) -> BTreeMap<String, Vec<(f64, f64)>> {
        let mut groups: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(record.polarization_label().to_string())
                .or_default()
                .push((record.wavelength, record.reflectivity));
        }
        for points in groups.values_mut() {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        groups
    }

    /// Whitespace-column text table, header first, rows in table order
    pub fn to_text(&self) -> String {
        let mut text = HEADER.join(SEPARATOR);
        for record in &self.records {
            text.push('\n');
            text.push_str(&record.to_line());
        }
        text
    }
}
