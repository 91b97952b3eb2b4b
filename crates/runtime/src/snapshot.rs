//! Snapshot requests
//!
//! Frame capture belongs to the camera side; the control loop only decides
//! when a snapshot is due and what it is called.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// A request to save the current annotated frame
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRequest {
    /// Target file, `screenshot_<YYYYmmdd_HHMMSS>.jpg` under the screenshots dir
    pub path: PathBuf,
    pub taken_at: DateTime<Local>,
    /// Triggered by a detection stop rather than by the operator
    pub automatic: bool,
    /// Detections inside the regions on that frame
    pub qualifying: usize,
}

impl SnapshotRequest {
    pub fn new(dir: &Path, taken_at: DateTime<Local>, automatic: bool, qualifying: usize) -> Self {
        let name = taken_at.format("screenshot_%Y%m%d_%H%M%S.jpg").to_string();
        Self {
            path: dir.join(name),
            taken_at,
            automatic,
            qualifying,
        }
    }
}

/// Receives snapshot requests
pub trait SnapshotSink {
    fn request(&mut self, request: SnapshotRequest);
}

/// Sink that only logs requests
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSnapshotSink;

impl SnapshotSink for LogSnapshotSink {
    fn request(&mut self, request: SnapshotRequest) {
        info!(
            "Snapshot requested: {} ({} detection(s) in regions)",
            request.path.display(),
            request.qualifying
        );
    }
}

/// Collects requests, for tests and embedding
impl SnapshotSink for Vec<SnapshotRequest> {
    fn request(&mut self, request: SnapshotRequest) {
        self.push(request);
    }
}
