//! Polygon rasterization into an occupancy grid

use crate::{MaskError, OccupancyGrid};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use roi_regions::Polygon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fill and binarization values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskParams {
    /// Cells strictly above this value become occupied
    pub threshold: u8,
    /// Fill value, and the value of occupied cells after thresholding
    pub max_value: u8,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            threshold: 127,
            max_value: 255,
        }
    }
}

impl MaskParams {
    pub fn new(threshold: u8, max_value: u8) -> Result<Self, MaskError> {
        let params = Self {
            threshold,
            max_value,
        };
        params.validate()?;
        Ok(params)
    }

    /// A fill value at or below the threshold would erase every region
    pub fn validate(&self) -> Result<(), MaskError> {
        if self.max_value <= self.threshold {
            return Err(MaskError::InvalidParams {
                threshold: self.threshold,
                max_value: self.max_value,
            });
        }
        Ok(())
    }
}

/// Rasterize polygons onto a `width` x `height` grid
///
/// Each polygon's interior and boundary is filled with `max_value`, then
/// every cell is thresholded: `> threshold` becomes `max_value`, anything
/// else 0. Overlapping polygons collapse to a single occupied cell.
pub fn rasterize<'a, I>(
    polygons: I,
    width: u32,
    height: u32,
    params: MaskParams,
) -> Result<OccupancyGrid, MaskError>
where
    I: IntoIterator<Item = &'a Polygon>,
{
    if width == 0 || height == 0 {
        return Err(MaskError::InvalidDimensions { width, height });
    }

    let mut image = GrayImage::new(width, height);
    let fill = Luma([params.max_value]);
    let mut count = 0;
    for polygon in polygons {
        fill_polygon(&mut image, polygon, fill);
        count += 1;
    }
    binarize(&mut image, params);

    debug!("Rasterized {} polygon(s) onto {}x{} grid", count, width, height);
    Ok(OccupancyGrid::from_image(image))
}

fn fill_polygon(image: &mut GrayImage, polygon: &Polygon, fill: Luma<u8>) {
    // Vertices are pinned one cell outside the grid so the filler never
    // walks, or overflows on, coordinates far beyond it
    let max_x = i32::try_from(image.width()).unwrap_or(i32::MAX);
    let max_y = i32::try_from(image.height()).unwrap_or(i32::MAX);
    let mut vertices: Vec<PixelPoint<i32>> = polygon
        .points()
        .iter()
        .map(|p| PixelPoint::new(p.x.clamp(-1, max_x), p.y.clamp(-1, max_y)))
        .collect();

    // The polygon filler rejects an explicit closing vertex
    vertices.dedup();
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    match vertices.as_slice() {
        [] => {}
        [p] => {
            if let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y)) {
                if x < image.width() && y < image.height() {
                    image.put_pixel(x, y, fill);
                }
            }
        }
        [a, b] => draw_line_segment_mut(
            image,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            fill,
        ),
        _ => draw_polygon_mut(image, &vertices, fill),
    }
}

fn binarize(image: &mut GrayImage, params: MaskParams) {
    for pixel in image.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > params.threshold {
            params.max_value
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roi_regions::{Point, RegionDocument};

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Polygon {
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_region_set() {
        let grid = rasterize(std::iter::empty(), 1280, 720, MaskParams::default()).unwrap();
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_rectangle_includes_boundary() {
        let grid = rasterize(&[rect(100, 100, 200, 200)], 1280, 720, MaskParams::default()).unwrap();
        assert!(grid.is_occupied(100, 100));
        assert!(grid.is_occupied(200, 200));
        assert!(grid.is_occupied(150, 150));
        assert!(!grid.is_occupied(99, 150));
        assert!(!grid.is_occupied(201, 150));
        assert_eq!(grid.occupied_count(), 101 * 101);
    }

    #[test]
    fn test_overlap_does_not_double_count() {
        let a = rect(0, 0, 9, 9);
        let b = rect(5, 5, 14, 14);
        let grid = rasterize([&a, &b], 64, 64, MaskParams::default()).unwrap();
        assert_eq!(grid.occupied_count(), 100 + 100 - 25);
        assert_eq!(grid.as_image().get_pixel(7, 7).0[0], 255);
    }

    #[test]
    fn test_occupied_value_is_max_value() {
        let params = MaskParams::new(10, 200).unwrap();
        let grid = rasterize(&[rect(0, 0, 3, 3)], 8, 8, params).unwrap();
        assert_eq!(grid.as_image().get_pixel(1, 1).0[0], 200);
        assert_eq!(grid.as_image().get_pixel(6, 6).0[0], 0);
    }

    #[test]
    fn test_polygon_clipped_to_grid() {
        let grid = rasterize(&[rect(-50, -50, 9, 9)], 20, 20, MaskParams::default()).unwrap();
        assert_eq!(grid.occupied_count(), 100);
    }

    #[test]
    fn test_degenerate_polygons_do_not_panic() {
        let closed = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(5, 5),
            Point::new(0, 0),
        ])
        .unwrap();
        let line = Polygon::new(vec![Point::new(2, 8), Point::new(6, 8), Point::new(6, 8)]).unwrap();
        let dot = Polygon::new(vec![Point::new(9, 9); 3]).unwrap();

        let grid = rasterize([&closed, &line, &dot], 16, 16, MaskParams::default()).unwrap();
        assert!(grid.is_occupied(4, 1));
        assert!(grid.is_occupied(4, 8));
        assert!(grid.is_occupied(9, 9));
    }

    #[test]
    fn test_extreme_coordinates_are_pinned_to_grid() {
        let document = RegionDocument::from_json(
            r#"{"m":{"regions":{"tall":[[0,-2147483648],[100,100],[0,100]],"wide":[[0,0],[2000000000,0],[0,0]]}}}"#,
        )
        .unwrap();
        let mask = document.mask("m").unwrap();

        let started = std::time::Instant::now();
        let grid = rasterize(mask.polygons(), 128, 128, MaskParams::default()).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert!(grid.is_occupied(10, 90));
        assert!(!grid.is_occupied(120, 90));
        assert!(grid.is_occupied(127, 0));
        assert!(!grid.is_occupied(127, 1));
    }

    #[test]
    fn test_invalid_params() {
        assert!(MaskParams::new(200, 200).is_err());
        assert!(rasterize(std::iter::empty(), 0, 10, MaskParams::default()).is_err());
    }

    fn arb_rect() -> impl Strategy<Value = Polygon> {
        (0i32..90, 0i32..90, 1i32..40, 1i32..40)
            .prop_map(|(x, y, w, h)| rect(x, y, x + w, y + h))
    }

    proptest! {
        #[test]
        fn prop_interior_cells_occupied(polygon in arb_rect()) {
            let grid = rasterize([&polygon], 128, 128, MaskParams::default()).unwrap();
            let (min, max) = polygon.bounds();
            for y in (min.y + 1)..max.y {
                for x in (min.x + 1)..max.x {
                    prop_assert!(grid.is_occupied(x as u32, y as u32));
                }
            }
        }

        #[test]
        fn prop_occupancy_monotone_in_polygon_set(
            polygons in proptest::collection::vec(arb_rect(), 1..6)
        ) {
            let mut previous = 0;
            for n in 0..=polygons.len() {
                let grid = rasterize(&polygons[..n], 128, 128, MaskParams::default()).unwrap();
                let count = grid.occupied_count();
                prop_assert!(count >= previous);
                previous = count;
            }
        }
    }
}
