//! Pattern location and fringe detection module
//!
//! This module turns a brightness matrix into geometry: the edge map of a
//! selection, the centroid and radii of the ring pattern it outlines, and
//! straight fringes crossing the pattern.

pub mod edges;
pub mod lines;
pub mod shape;

pub use edges::{extract_edges, EdgeExtraction, EdgeExtractor, EdgeMap};
pub use lines::{detect_lines, LineDetectionMode, LineDetector, LineSegment};
pub use shape::{estimate_shape, Centroid, RadiusPair, ShapeEstimate};
