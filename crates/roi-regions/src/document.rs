//! Region document data model

use crate::RegionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer pixel coordinate in reference-frame space
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp into `[0, width) x [0, height)`
    pub fn clamped(self, width: u32, height: u32) -> Self {
        let max_x = i32::try_from(width.saturating_sub(1)).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height.saturating_sub(1)).unwrap_or(i32::MAX);
        Self {
            x: self.x.clamp(0, max_x),
            y: self.y.clamp(0, max_y),
        }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Closed polygon with at least three vertices
///
/// Vertices are kept in the order they were supplied. Polygons produced by
/// [`crate::finalize_polygon`] are ordered by polar angle around their
/// centroid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Minimum vertex count
    pub const MIN_POINTS: usize = 3;

    /// Create a polygon, rejecting fewer than three vertices
    pub fn new(points: Vec<Point>) -> Result<Self, RegionError> {
        if points.len() < Self::MIN_POINTS {
            return Err(RegionError::InsufficientPoints(points.len()));
        }
        Ok(Self { points })
    }

    /// Four-vertex polygon, valid by construction
    pub(crate) fn quad(corners: [Point; 4]) -> Self {
        Self {
            points: corners.to_vec(),
        }
    }

    /// Vertices in order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds as (min, max) corners
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = self.points[0];
        let mut max = self.points[0];
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Map vertices from one frame resolution to another (truncating)
    pub fn scaled(&self, from: (u32, u32), to: (u32, u32)) -> Polygon {
        if from == to || from.0 == 0 || from.1 == 0 {
            return self.clone();
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Polygon {
            points: self
                .points
                .iter()
                .map(|p| Point::new((p.x as f64 * sx) as i32, (p.y as f64 * sy) as i32))
                .collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = RegionError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Polygon::new(points)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

/// Named set of regions, selectable as a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskConfig {
    #[serde(default)]
    pub regions: BTreeMap<String, Polygon>,
}

impl MaskConfig {
    /// All polygons in region-name order
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.regions.values()
    }

    /// Region names in order
    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    /// Polygon of a region
    pub fn region(&self, name: &str) -> Option<&Polygon> {
        self.regions.get(name)
    }

    /// `region-<n>` for the smallest unused n >= 1
    pub fn next_region_name(&self) -> String {
        (1..)
            .map(|n| format!("region-{}", n))
            .find(|name| !self.regions.contains_key(name))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Top-level persisted object: mask name -> mask configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionDocument {
    masks: BTreeMap<String, MaskConfig>,
}

fn check_name(name: &str) -> Result<(), RegionError> {
    if name.trim().is_empty() {
        Err(RegionError::EmptyName)
    } else {
        Ok(())
    }
}

impl RegionDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted JSON representation
    pub fn from_json(text: &str) -> Result<Self, RegionError> {
        serde_json::from_str(text).map_err(|e| RegionError::CorruptDocument(e.to_string()))
    }

    /// Render as pretty JSON (two-space indent)
    pub fn to_json_pretty(&self) -> Result<String, RegionError> {
        serde_json::to_string_pretty(self).map_err(|e| RegionError::CorruptDocument(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn contains_mask(&self, name: &str) -> bool {
        self.masks.contains_key(name)
    }

    /// Mask names in order
    pub fn mask_names(&self) -> impl Iterator<Item = &str> {
        self.masks.keys().map(String::as_str)
    }

    /// First mask name in order, used as the default selection
    pub fn first_mask_name(&self) -> Option<&str> {
        self.masks.keys().next().map(String::as_str)
    }

    /// Look up a mask configuration
    pub fn mask(&self, name: &str) -> Result<&MaskConfig, RegionError> {
        self.masks
            .get(name)
            .ok_or_else(|| RegionError::UnknownMask(name.to_string()))
    }

    fn mask_mut(&mut self, name: &str) -> Result<&mut MaskConfig, RegionError> {
        self.masks
            .get_mut(name)
            .ok_or_else(|| RegionError::UnknownMask(name.to_string()))
    }

    /// Add an empty mask configuration
    pub fn add_mask(&mut self, name: &str) -> Result<(), RegionError> {
        check_name(name)?;
        if self.masks.contains_key(name) {
            return Err(RegionError::DuplicateName(name.to_string()));
        }
        self.masks.insert(name.to_string(), MaskConfig::default());
        Ok(())
    }

    /// Rename a mask; renaming to the same name is a no-op
    pub fn rename_mask(&mut self, from: &str, to: &str) -> Result<(), RegionError> {
        check_name(to)?;
        if !self.masks.contains_key(from) {
            return Err(RegionError::UnknownMask(from.to_string()));
        }
        if from == to {
            return Ok(());
        }
        if self.masks.contains_key(to) {
            return Err(RegionError::DuplicateName(to.to_string()));
        }
        if let Some(mask) = self.masks.remove(from) {
            self.masks.insert(to.to_string(), mask);
        }
        Ok(())
    }

    /// Remove a mask and return it
    pub fn remove_mask(&mut self, name: &str) -> Result<MaskConfig, RegionError> {
        self.masks
            .remove(name)
            .ok_or_else(|| RegionError::UnknownMask(name.to_string()))
    }

    /// Insert a region under an explicit name
    pub fn insert_region(
        &mut self,
        mask: &str,
        region: &str,
        polygon: Polygon,
    ) -> Result<(), RegionError> {
        check_name(region)?;
        let config = self.mask_mut(mask)?;
        if config.regions.contains_key(region) {
            return Err(RegionError::DuplicateName(region.to_string()));
        }
        config.regions.insert(region.to_string(), polygon);
        Ok(())
    }

    /// Insert a region under the next free `region-<n>` name
    pub fn add_region(&mut self, mask: &str, polygon: Polygon) -> Result<String, RegionError> {
        let config = self.mask_mut(mask)?;
        let name = config.next_region_name();
        config.regions.insert(name.clone(), polygon);
        Ok(name)
    }

    /// Rename a region within its mask; same name is a no-op
    pub fn rename_region(&mut self, mask: &str, from: &str, to: &str) -> Result<(), RegionError> {
        check_name(to)?;
        let config = self.mask_mut(mask)?;
        if !config.regions.contains_key(from) {
            return Err(RegionError::UnknownRegion {
                mask: mask.to_string(),
                region: from.to_string(),
            });
        }
        if from == to {
            return Ok(());
        }
        if config.regions.contains_key(to) {
            return Err(RegionError::DuplicateName(to.to_string()));
        }
        if let Some(polygon) = config.regions.remove(from) {
            config.regions.insert(to.to_string(), polygon);
        }
        Ok(())
    }

    /// Remove a region and return its polygon
    pub fn remove_region(&mut self, mask: &str, region: &str) -> Result<Polygon, RegionError> {
        let config = self.mask_mut(mask)?;
        config
            .regions
            .remove(region)
            .ok_or_else(|| RegionError::UnknownRegion {
                mask: mask.to_string(),
                region: region.to_string(),
            })
    }

    /// Remove every region of a mask, returning how many were removed
    pub fn clear_regions(&mut self, mask: &str) -> Result<usize, RegionError> {
        let config = self.mask_mut(mask)?;
        let removed = config.regions.len();
        config.regions.clear();
        Ok(removed)
    }
}
