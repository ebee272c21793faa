//! Calibration table construction and forward-fill
//!
//! A calibration file is a headerless CSV file of seven-column rows:
//! nominal wavelength, measured peak wavelength, FWHM, exposure, brightness,
//! gain and polarization. Rows whose first field is a number are data; any
//! other row (text, blank line) separates blocks. Cells left empty repeat the
//! last value given in their column.

use crate::constants::calibration::{
    BRIGHTNESS, EXPOSURE, FIELD_COUNT, FWHM, GAIN, PEAK, POLARIZATION, WAVELENGTH,
};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One calibration record with exactly seven text fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRow {
    fields: [String; FIELD_COUNT],
}

impl CalibrationRow {
    pub fn new(fields: [String; FIELD_COUNT]) -> Self {
        Self { fields }
    }

    /// Build a row from any number of fields, padding with empty fields or
    /// dropping extra ones
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row = Self::default();
        for (slot, value) in row.fields.iter_mut().zip(fields) {
            *slot = value.into();
        }
        row
    }

    pub fn fields(&self) -> &[String; FIELD_COUNT] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn wavelength(&self) -> &str {
        &self.fields[WAVELENGTH]
    }

    pub fn peak(&self) -> &str {
        &self.fields[PEAK]
    }

    pub fn fwhm(&self) -> &str {
        &self.fields[FWHM]
    }

    pub fn exposure(&self) -> &str {
        &self.fields[EXPOSURE]
    }

    pub fn brightness(&self) -> &str {
        &self.fields[BRIGHTNESS]
    }

    pub fn gain(&self) -> &str {
        &self.fields[GAIN]
    }

    pub fn polarization(&self) -> &str {
        &self.fields[POLARIZATION]
    }

    /// Measured peak wavelength, if it is a finite number
    pub fn peak_value(&self) -> Option<f64> {
        parse_number(self.peak()).filter(|v| v.is_finite())
    }

    fn default_peak(&mut self) {
        if self.fields[PEAK].is_empty() {
            self.fields[PEAK] = self.fields[WAVELENGTH].clone();
        }
    }
}

/// Consecutive data rows between two separators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBlock {
    rows: Vec<CalibrationRow>,
}

impl CalibrationBlock {
    pub fn new(rows: Vec<CalibrationRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CalibrationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Calibration blocks in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationTable {
    blocks: Vec<CalibrationBlock>,
}

impl CalibrationTable {
    pub fn new(blocks: Vec<CalibrationBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[CalibrationBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&CalibrationBlock> {
        self.blocks.get(index)
    }

    /// Every row of every block, in table order
    pub fn rows(&self) -> impl Iterator<Item = &CalibrationRow> {
        self.blocks.iter().flat_map(|b| b.rows.iter())
    }

    /// True when the table holds no row at all
    pub fn is_empty(&self) -> bool {
        self.rows().next().is_none()
    }

    /// Read, split and forward-fill a calibration file
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CalibrationError` if the file cannot be opened
    /// or is not valid CSV.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| AnalysisError::calibration(format!("cannot open {}", path.display()), e))?;
        let table = normalize(build_table(read_raw_rows(file)?));
        info!(
            path = %path.display(),
            blocks = table.blocks.len(),
            rows = table.rows().count(),
            "loaded calibration table"
        );
        Ok(table)
    }
}

/// Parse a field the way numeric calibration cells are written
fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok()
}

/// Split raw rows into blocks
///
/// A row whose first field parses as a number is appended to the current
/// block. Any other row closes the current block, unless the block is still
/// empty, so runs of separators produce a single boundary. A table whose
/// last row is a separator therefore ends with one empty block.
pub fn build_table<I, R, S>(raw_rows: I) -> CalibrationTable
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut blocks = vec![CalibrationBlock::default()];
    for raw in raw_rows {
        let row = CalibrationRow::from_fields(raw);
        let numeric = parse_number(row.wavelength()).is_some();
        // `blocks` always holds at least one block
        let current = blocks.len() - 1;
        if numeric {
            blocks[current].rows.push(row);
        } else if !blocks[current].is_empty() {
            blocks.push(CalibrationBlock::default());
        }
    }
    debug!(blocks = blocks.len(), "split calibration rows");
    CalibrationTable { blocks }
}

/// Forward-fill empty cells across the whole table
///
/// Before filling, an empty peak field takes the row's own nominal
/// wavelength. Each remaining empty field takes the last non-empty value of
/// its column. The running values carry over block boundaries. An empty
/// table is returned unchanged.
pub fn normalize(table: CalibrationTable) -> CalibrationTable {
    if table.is_empty() {
        return table;
    }
    let mut seed = table.rows().next().cloned().unwrap_or_default();
    seed.default_peak();

    let (blocks, _) = table.blocks.into_iter().fold(
        (Vec::new(), seed.fields),
        |(mut blocks, current), block| {
            let (rows, current) = block.rows.into_iter().fold(
                (Vec::new(), current),
                |(mut rows, current), row| {
                    let (row, current) = forward_fill(row, current);
                    rows.push(row);
                    (rows, current)
                },
            );
            blocks.push(CalibrationBlock { rows });
            (blocks, current)
        },
    );
    CalibrationTable { blocks }
}

fn forward_fill(
    mut row: CalibrationRow,
    mut current: [String; FIELD_COUNT],
) -> (CalibrationRow, [String; FIELD_COUNT]) {
    row.default_peak();
    for (field, value) in row.fields.iter_mut().zip(current.iter_mut()) {
        if field.is_empty() {
            field.clone_from(value);
        } else {
            value.clone_from(field);
        }
    }
    (row, current)
}

/// Read headerless CSV rows of any length
///
/// Blank lines are returned as empty rows so that they still separate
/// blocks.
///
/// # Errors
///
/// Returns `AnalysisError::CalibrationError` on I/O failure or malformed CSV.
pub fn read_raw_rows<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| AnalysisError::calibration("cannot read calibration data", e))?;

    // The csv reader skips empty lines; mark them with an empty quoted field
    let content = content
        .lines()
        .map(|line| if line.is_empty() { "\"\"" } else { line })
        .collect::<Vec<_>>()
        .join("\n");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    rdr.records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<String>>())
                .map_err(|e| AnalysisError::calibration("malformed calibration row", e))
        })
        .collect()
}
