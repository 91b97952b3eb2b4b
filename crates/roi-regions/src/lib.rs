//! Region Document Model
//!
//! Named mask configurations made of named polygonal regions of interest,
//! as authored against a reference camera frame and consumed by the
//! detection runtime. This crate provides:
//! - The persisted data model and its JSON form
//! - Polygon authoring geometry (clamping, centroid-angle ordering)
//! - An undoable editor session over a document
//! - A file store with strict and lenient loading

mod document;
mod editor;
mod error;
mod geometry;
mod store;

pub use document::{MaskConfig, Point, Polygon, RegionDocument};
pub use editor::RegionEditor;
pub use error::RegionError;
pub use geometry::{finalize_polygon, rectangle_from_corners};
pub use store::RegionStore;

/// Reference frame resolution used when authoring regions
pub const REFERENCE_WIDTH: u32 = 1280;
/// Reference frame height used when authoring regions
pub const REFERENCE_HEIGHT: u32 = 720;
