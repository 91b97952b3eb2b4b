//! Detection boxes in grid coordinates

use serde::{Deserialize, Serialize};

/// Axis-aligned box `(x1, y1)`-`(x2, y2)`, half-open on the far edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Clip to `[0, width] x [0, height]`
    ///
    /// Returns `None` when nothing of the box is left.
    pub fn clipped(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = |v: i32, max: u32| v.clamp(0, i32::try_from(max).unwrap_or(i32::MAX)) as u32;
        let x1 = clip(self.x1, width);
        let y1 = clip(self.y1, height);
        let x2 = clip(self.x2, width);
        let y2 = clip(self.y2, height);
        (x2 > x1 && y2 > y1).then_some((x1, y1, x2, y2))
    }
}

/// One detected object on one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,

    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    /// Map a detector box from its input resolution onto the grid
    ///
    /// The detector runs on a downscaled frame; coordinates are scaled by
    /// `target / source` per axis and truncated toward zero.
    pub fn from_model_output(
        xyxy: [f32; 4],
        confidence: f32,
        source: (u32, u32),
        target: (u32, u32),
    ) -> Self {
        let sx = scale(source.0, target.0);
        let sy = scale(source.1, target.1);
        let [x1, y1, x2, y2] = xyxy;
        Self {
            bbox: BoundingBox::new(
                (x1 * sx) as i32,
                (y1 * sy) as i32,
                (x2 * sx) as i32,
                (y2 * sy) as i32,
            ),
            confidence,
        }
    }
}

fn scale(source: u32, target: u32) -> f32 {
    if source == 0 {
        1.0
    } else {
        target as f32 / source as f32
    }
}
