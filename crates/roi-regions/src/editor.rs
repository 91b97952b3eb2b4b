//! Undoable editing session over a region document

use crate::geometry::{finalize_polygon, rectangle_from_corners};
use crate::{Point, RegionDocument, RegionError};
use tracing::{debug, info};

/// Document plus selection, captured before each edit
#[derive(Debug, Clone)]
struct Snapshot {
    document: RegionDocument,
    selected: Option<String>,
}

/// Editing session for region authoring
///
/// Every mutation is validated against a draft copy first; only a successful
/// edit replaces the live document, moving the previous one onto the undo
/// stack. The editor never touches the disk; callers persist through
/// [`crate::RegionStore`] after each successful edit.
pub struct RegionEditor {
    document: RegionDocument,
    selected: Option<String>,
    /// Canvas size points are clamped to
    bounds: (u32, u32),
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl RegionEditor {
    /// Start a session; the first mask (if any) is selected
    pub fn new(document: RegionDocument, bounds: (u32, u32)) -> Self {
        let selected = document.first_mask_name().map(str::to_string);
        Self {
            document,
            selected,
            bounds,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn document(&self) -> &RegionDocument {
        &self.document
    }

    /// Currently selected mask
    pub fn selected_mask(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn bounds(&self) -> (u32, u32) {
        self.bounds
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Change the selected mask (not recorded in history)
    pub fn select_mask(&mut self, name: &str) -> Result<(), RegionError> {
        self.document.mask(name)?;
        self.selected = Some(name.to_string());
        Ok(())
    }

    fn selected_or_err(&self) -> Result<String, RegionError> {
        self.selected.clone().ok_or(RegionError::NoMaskSelected)
    }

    /// Apply an edit to a draft and commit it on success
    fn commit<T, F>(&mut self, edit: F) -> Result<T, RegionError>
    where
        F: FnOnce(&mut RegionDocument, &mut Option<String>) -> Result<T, RegionError>,
    {
        let mut document = self.document.clone();
        let mut selected = self.selected.clone();
        let out = edit(&mut document, &mut selected)?;

        let previous = Snapshot {
            document: std::mem::replace(&mut self.document, document),
            selected: std::mem::replace(&mut self.selected, selected),
        };
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        Ok(out)
    }

    /// Create an empty mask and select it
    pub fn add_mask(&mut self, name: &str) -> Result<(), RegionError> {
        self.commit(|doc, selected| {
            doc.add_mask(name)?;
            *selected = Some(name.to_string());
            Ok(())
        })?;
        info!("Added mask '{}'", name);
        Ok(())
    }

    /// Rename a mask; the selection follows the rename
    pub fn rename_mask(&mut self, from: &str, to: &str) -> Result<(), RegionError> {
        if from == to {
            self.document.mask(from)?;
            return Ok(());
        }
        self.commit(|doc, selected| {
            doc.rename_mask(from, to)?;
            if selected.as_deref() == Some(from) {
                *selected = Some(to.to_string());
            }
            Ok(())
        })?;
        info!("Renamed mask '{}' -> '{}'", from, to);
        Ok(())
    }

    /// Delete a mask; if it was selected, the first remaining mask is selected
    pub fn delete_mask(&mut self, name: &str) -> Result<(), RegionError> {
        self.commit(|doc, selected| {
            doc.remove_mask(name)?;
            if selected.as_deref() == Some(name) {
                *selected = doc.first_mask_name().map(str::to_string);
            }
            Ok(())
        })?;
        info!("Deleted mask '{}'", name);
        Ok(())
    }

    /// Finalize freeform points into a region of the selected mask
    pub fn add_polygon_region(&mut self, points: &[Point]) -> Result<String, RegionError> {
        let polygon = finalize_polygon(points, self.bounds)?;
        let mask = self.selected_or_err()?;
        let name = self.commit(|doc, _| doc.add_region(&mask, polygon))?;
        debug!("Added polygon region '{}' to '{}'", name, mask);
        Ok(name)
    }

    /// Add a rectangle spanned by two opposite corners to the selected mask
    pub fn add_rect_region(&mut self, a: Point, b: Point) -> Result<String, RegionError> {
        let polygon = rectangle_from_corners(a, b, self.bounds);
        let mask = self.selected_or_err()?;
        let name = self.commit(|doc, _| doc.add_region(&mask, polygon))?;
        debug!("Added rectangle region '{}' to '{}'", name, mask);
        Ok(name)
    }

    pub fn rename_region(&mut self, from: &str, to: &str) -> Result<(), RegionError> {
        let mask = self.selected_or_err()?;
        if from == to {
            return self.document.rename_region(&mask, from, to);
        }
        self.commit(|doc, _| doc.rename_region(&mask, from, to))
    }

    pub fn delete_region(&mut self, name: &str) -> Result<(), RegionError> {
        let mask = self.selected_or_err()?;
        self.commit(|doc, _| doc.remove_region(&mask, name).map(|_| ()))
    }

    /// Remove all regions of the selected mask
    pub fn clear_regions(&mut self) -> Result<usize, RegionError> {
        let mask = self.selected_or_err()?;
        self.commit(|doc, _| doc.clear_regions(&mask))
    }

    /// Restore the state before the last edit
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.swap_in(snapshot);
        self.redo_stack.push(current);
        true
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.swap_in(snapshot);
        self.undo_stack.push(current);
        true
    }

    fn swap_in(&mut self, snapshot: Snapshot) -> Snapshot {
        Snapshot {
            document: std::mem::replace(&mut self.document, snapshot.document),
            selected: std::mem::replace(&mut self.selected, snapshot.selected),
        }
    }
}
