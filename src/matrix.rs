//! Brightness matrices, rectangles and block statistics
//!
//! A [`BrightnessMatrix`] is the only image representation the analysis core
//! works with: an owned, row-major grid of 8-bit gray levels. Decoding image
//! files is left to the caller. The matrix is converted to an OpenCV `Mat`
//! only at the edge-detection boundary.
//!
//! All rectangles are expressed in matrix coordinates, `x` growing to the
//! right (columns) and `y` growing downwards (rows).

use crate::error::{AnalysisError, Result};
use opencv::core::{Mat, CV_8UC1};
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

/// Integer pixel position in matrix coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by `origin`
    pub fn offset(&self, origin: Point) -> Self {
        Self::new(self.x + origin.x, self.y + origin.y)
    }
}

/// Integer rectangle in matrix coordinates
///
/// The right and bottom edges are exclusive. A rectangle with a negative
/// width or height describes a selection dragged up or left; use
/// [`Rect::normalized`] to flip it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning `[x1, x2) × [y1, y2)`
    pub fn from_bounds(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
    }

    /// Same area with non-negative width and height
    ///
    /// Saturates at the `i32` range.
    pub fn normalized(&self) -> Self {
        let (x, width) = if self.width < 0 {
            (self.x.saturating_add(self.width), self.width.saturating_neg())
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0 {
            (self.y.saturating_add(self.height), self.height.saturating_neg())
        } else {
            (self.y, self.height)
        };
        Self::new(x, y, width, height)
    }

    /// Exact `(x1, y1, x2, y2)` of the normalized rectangle
    pub fn bounds(&self) -> (i64, i64, i64, i64) {
        let (x, y) = (self.x as i64, self.y as i64);
        let (right, bottom) = (x + self.width as i64, y + self.height as i64);
        (x.min(right), y.min(bottom), x.max(right), y.max(bottom))
    }

    /// True when the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }
}

/// Mean and spread of one rectangular block of pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub count: usize,
}

/// Summary of a selection, as shown next to the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStatistics {
    pub maximum: u8,
    pub minimum: u8,
    pub mean: f64,
    pub std: f64,
}

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BrightnessMatrix {
    /// Wrap row-major pixel data
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DimensionMismatch` if `data.len()` is not
    /// `width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height {
            return Err(AnalysisError::DimensionMismatch {
                expected: format!("{}x{} = {} pixels", width, height, width * height),
                actual: format!("{} pixels", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Matrix filled with a single value
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a matrix by evaluating `f(x, y)` at every pixel
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Clamp a rectangle to the matrix bounds
    ///
    /// The rectangle is normalized first. The result may be empty when the
    /// rectangle lies entirely outside the matrix.
    pub fn clamp_rect(&self, rect: Rect) -> Rect {
        let (x1, y1, x2, y2) = rect.bounds();
        self.clamp_bounds(x1, y1, x2, y2)
    }

    /// Region of the matrix covered by `[x1, x2) × [y1, y2)`
    pub fn clamp_bounds(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Rect {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x1, y1) = (x1.clamp(0, w), y1.clamp(0, h));
        let (x2, y2) = (x2.clamp(x1, w), y2.clamp(y1, h));
        Rect::from_bounds(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    /// Resolve an optional selection to the region it covers
    ///
    /// A missing or empty selection means the whole matrix.
    pub fn selection_bounds(&self, selection: Option<Rect>) -> Rect {
        match selection {
            Some(rect) if rect.width != 0 && rect.height != 0 => self.clamp_rect(rect),
            _ => Rect::new(0, 0, self.width as i32, self.height as i32),
        }
    }

    /// Copy out the pixels inside `rect` (clamped to the matrix)
    pub fn crop(&self, rect: Rect) -> BrightnessMatrix {
        let r = self.clamp_rect(rect);
        let (w, h) = (r.width as usize, r.height as usize);
        let mut data = Vec::with_capacity(w * h);
        for y in r.y as usize..r.bottom() as usize {
            let start = y * self.width + r.x as usize;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        BrightnessMatrix {
            width: w,
            height: h,
            data,
        }
    }

    /// Mean and standard deviation of the pixels in `[x1, x2) × [y1, y2)`
    ///
    /// Bounds outside the matrix are clipped. Returns `None` when no pixel
    /// remains.
    pub fn block_stats(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Option<BlockStats> {
        let (w, h) = (self.width as i64, self.height as i64);
        let (x1, x2) = (x1.clamp(0, w), x2.clamp(0, w));
        let (y1, y2) = (y1.clamp(0, h), y2.clamp(0, h));
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for y in y1..y2 {
            let row = (y * w) as usize;
            for &v in &self.data[row + x1 as usize..row + x2 as usize] {
                let v = v as f64;
                sum += v;
                sum_sq += v * v;
            }
        }

        let count = ((x2 - x1) * (y2 - y1)) as usize;
        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        Some(BlockStats {
            mean,
            std: variance.sqrt(),
            count,
        })
    }

    /// Maximum, minimum, mean and spread of a selection
    ///
    /// Returns `None` if the selection covers no pixels.
    pub fn statistics(&self, selection: Option<Rect>) -> Option<RegionStatistics> {
        let r = self.selection_bounds(selection);
        let stats = self.block_stats(
            r.x as i64,
            r.y as i64,
            r.right() as i64,
            r.bottom() as i64,
        )?;

        let mut maximum = u8::MIN;
        let mut minimum = u8::MAX;
        for y in r.y as usize..r.bottom() as usize {
            let row = y * self.width;
            for &v in &self.data[row + r.x as usize..row + r.right() as usize] {
                maximum = maximum.max(v);
                minimum = minimum.min(v);
            }
        }

        Some(RegionStatistics {
            maximum,
            minimum,
            mean: stats.mean,
            std: stats.std,
        })
    }

    /// Subtract a background frame, clipping negative results to zero
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DimensionMismatch` if the frames differ in size.
    pub fn subtract_background(&self, background: &BrightnessMatrix) -> Result<BrightnessMatrix> {
        if background.width != self.width || background.height != self.height {
            return Err(AnalysisError::DimensionMismatch {
                expected: format!("{}x{}", self.width, self.height),
                actual: format!("{}x{}", background.width, background.height),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&background.data)
            .map(|(&v, &b)| v.saturating_sub(b))
            .collect();
        Ok(BrightnessMatrix {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Copy into a single-channel 8-bit OpenCV `Mat`
    pub fn to_mat(&self) -> Result<Mat> {
        let rows = self.height as i32;
        let cols = self.width as i32;
        let borrowed = Mat::new_rows_cols_with_data(rows, cols, &self.data)
            .map_err(|e| AnalysisError::opencv("Mat creation", e))?;
        borrowed
            .try_clone()
            .map_err(|e| AnalysisError::opencv("Mat copy", e))
    }

    /// Copy a single-channel 8-bit OpenCV `Mat`
    pub fn from_mat(mat: &Mat) -> Result<Self> {
        if mat.typ() != CV_8UC1 {
            return Err(AnalysisError::invalid_parameter("mat type", mat.typ()));
        }
        let width = mat.cols().max(0) as usize;
        let height = mat.rows().max(0) as usize;
        let data = if mat.is_continuous() {
            mat.data_bytes()
                .map_err(|e| AnalysisError::opencv("Mat data access", e))?
                .to_vec()
        } else {
            let mut data = Vec::with_capacity(width * height);
            for row in 0..height as i32 {
                for col in 0..width as i32 {
                    let v = *mat
                        .at_2d::<u8>(row, col)
                        .map_err(|e| AnalysisError::opencv("Pixel access", e))?;
                    data.push(v);
                }
            }
            data
        };
        Self::new(width, height, data)
    }
}
