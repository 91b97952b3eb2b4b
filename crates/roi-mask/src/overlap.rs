//! Box-versus-grid overlap test

use crate::{BoundingBox, MaskError, OccupancyGrid};

/// Fraction of the box's cells that are occupied
///
/// The box is clipped to the grid first. `None` when the clipped box has
/// zero area.
pub fn overlap_fraction(bbox: &BoundingBox, grid: &OccupancyGrid) -> Option<f64> {
    let (x1, y1, x2, y2) = bbox.clipped(grid.width(), grid.height())?;
    let (occupied, total) = grid.count_in(x1, y1, x2, y2);
    Some(occupied as f64 / total as f64)
}

/// Classifies a box as inside the regions by overlap fraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapEvaluator {
    threshold: f64,
}

impl OverlapEvaluator {
    pub fn new(threshold: f64) -> Result<Self, MaskError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MaskError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Inside iff the overlap fraction is at least the threshold
    ///
    /// A zero-area box is never inside.
    pub fn is_inside(&self, bbox: &BoundingBox, grid: &OccupancyGrid) -> bool {
        overlap_fraction(bbox, grid).map_or(false, |f| f >= self.threshold)
    }
}
