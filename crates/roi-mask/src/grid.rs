//! Occupancy grid

use crate::MaskError;
use image::GrayImage;

/// Binary occupancy grid at runtime frame resolution
///
/// Backed by a single-channel image; a cell is occupied when its value is
/// non-zero. Built by [`crate::rasterize`] and treated as immutable
/// afterwards, so it can be shared across ticks behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    image: GrayImage,
}

impl OccupancyGrid {
    /// All-unoccupied grid
    pub fn empty(width: u32, height: u32) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::InvalidDimensions { width, height });
        }
        Ok(Self {
            image: GrayImage::new(width, height),
        })
    }

    pub(crate) fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Whether a cell is occupied; out-of-bounds cells are not
    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| p.0[0] != 0)
            .unwrap_or(false)
    }

    /// Total occupied cells
    pub fn occupied_count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != 0).count()
    }

    /// Occupied and total cells in `[x0, x1) x [y0, y1)`
    ///
    /// Bounds must already be clipped to the grid.
    pub(crate) fn count_in(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> (usize, usize) {
        let width = self.image.width() as usize;
        let raw = self.image.as_raw();
        let mut occupied = 0;
        for y in y0 as usize..y1 as usize {
            let row = &raw[y * width + x0 as usize..y * width + x1 as usize];
            occupied += row.iter().filter(|&&v| v != 0).count();
        }
        let total = (x1 - x0) as usize * (y1 - y0) as usize;
        (occupied, total)
    }

    /// Underlying mask image, for overlay rendering by callers
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}
