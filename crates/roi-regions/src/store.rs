//! Region document file store

use crate::{RegionDocument, RegionError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JSON file holding a region document
#[derive(Debug, Clone)]
pub struct RegionStore {
    path: PathBuf,
}

impl RegionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load: missing or unparseable files are errors
    ///
    /// Used by the detection runtime, which must not run with unknown regions.
    pub fn load(&self) -> Result<RegionDocument, RegionError> {
        let text = fs::read_to_string(&self.path)?;
        let document = RegionDocument::from_json(&text)?;
        info!(
            "Loaded {} mask(s) from {}",
            document.len(),
            self.path.display()
        );
        Ok(document)
    }

    /// Lenient load for authoring: fall back to an empty document
    pub fn load_or_default(&self) -> RegionDocument {
        match self.load() {
            Ok(document) => document,
            Err(RegionError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!("No region document at {}, starting empty", self.path.display());
                RegionDocument::new()
            }
            Err(e) => {
                warn!(
                    "Failed to load {}: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                RegionDocument::new()
            }
        }
    }

    /// Write the document via a temporary file and rename
    pub fn save(&self, document: &RegionDocument) -> Result<(), RegionError> {
        let json = document.to_json_pretty()?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved region document to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
