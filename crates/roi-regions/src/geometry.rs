//! Polygon authoring geometry

use crate::{Point, Polygon, RegionError};
use std::cmp::Ordering;

/// Turn an unordered set of clicked points into a polygon
///
/// Points are clamped to `[0, width-1] x [0, height-1]` and sorted by the
/// angle `atan2(y - cy, x - cx)` around their centroid, ascending. In image
/// coordinates (y down) this yields clockwise order on screen, starting from
/// the point closest to the left/upper direction.
///
/// The ordering is only guaranteed to be simple for convex and star-shaped
/// point sets; concave sets may self-intersect.
pub fn finalize_polygon(points: &[Point], bounds: (u32, u32)) -> Result<Polygon, RegionError> {
    if points.len() < Polygon::MIN_POINTS {
        return Err(RegionError::InsufficientPoints(points.len()));
    }

    let (width, height) = bounds;
    let mut clamped: Vec<Point> = points.iter().map(|p| p.clamped(width, height)).collect();

    let n = clamped.len() as f64;
    let cx = clamped.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let cy = clamped.iter().map(|p| p.y as f64).sum::<f64>() / n;

    let angle = |p: &Point| (p.y as f64 - cy).atan2(p.x as f64 - cx);
    clamped.sort_by(|a, b| angle(a).partial_cmp(&angle(b)).unwrap_or(Ordering::Equal));

    Polygon::new(clamped)
}

/// Build a rectangle from two opposite corners
///
/// Corners are clamped to the canvas and emitted in fixed clockwise order:
/// top-left, top-right, bottom-right, bottom-left. No angle sort is applied.
pub fn rectangle_from_corners(a: Point, b: Point, bounds: (u32, u32)) -> Polygon {
    let (width, height) = bounds;
    let a = a.clamped(width, height);
    let b = b.clamped(width, height);

    let left = a.x.min(b.x);
    let right = a.x.max(b.x);
    let top = a.y.min(b.y);
    let bottom = a.y.max(b.y);

    Polygon::quad([
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ])
}
