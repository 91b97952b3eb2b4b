//! ROI Masking and Detection Gating
//!
//! Turns a mask configuration into an occupancy grid at runtime frame
//! resolution and decides, per frame, whether any detection lies inside it:
//! - Polygon rasterization with fill-then-threshold binarization
//! - Fractional overlap test for a detection box against the grid
//! - Confidence filtering and per-frame "object in ROI" signal

mod detection;
mod gate;
mod grid;
mod overlap;
mod raster;

pub use detection::{BoundingBox, Detection};
pub use gate::{DetectionGate, GateConfig, GateOutcome};
pub use grid::OccupancyGrid;
pub use overlap::{overlap_fraction, OverlapEvaluator};
pub use raster::{rasterize, MaskParams};

use thiserror::Error;

/// Mask error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaskError {
    #[error("Invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Mask max value {max_value} must exceed threshold {threshold}")]
    InvalidParams { threshold: u8, max_value: u8 },

    #[error("Threshold {0} outside [0, 1]")]
    InvalidThreshold(f64),
}
