//! Region Error Types

use thiserror::Error;

/// Errors raised while authoring, loading, or saving region documents
#[derive(Debug, Error)]
pub enum RegionError {
    /// Polygon finalization needs at least three points
    #[error("Need at least 3 points to finish a region, got {0}")]
    InsufficientPoints(usize),

    /// Mask name not present in the document
    #[error("Mask '{0}' does not exist")]
    UnknownMask(String),

    /// Region name not present in the mask
    #[error("Region '{region}' does not exist in mask '{mask}'")]
    UnknownRegion { mask: String, region: String },

    /// Name already taken by a sibling
    #[error("'{0}' already exists")]
    DuplicateName(String),

    /// Blank mask or region name
    #[error("Name must not be empty")]
    EmptyName,

    /// Region operation attempted with no mask selected
    #[error("No mask selected")]
    NoMaskSelected,

    /// Persisted document failed to parse
    #[error("Region document is corrupt: {0}")]
    CorruptDocument(String),

    /// File system failure
    #[error("Region document I/O error: {0}")]
    Io(#[from] std::io::Error),
}
