//! Per-frame control session

use crate::snapshot::{SnapshotRequest, SnapshotSink};
use crate::RuntimeError;
use chrono::Local;
use motor_control::{
    ControlEvent, ControlReport, Intent, MotorCommand, MotorController, MotorLink, MotorState,
};
use roi_mask::{rasterize, Detection, DetectionGate, GateOutcome, MaskParams, OccupancyGrid};
use roi_regions::RegionDocument;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed session parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Occupancy grid resolution
    pub frame_size: (u32, u32),
    /// Resolution the document was authored at
    pub reference_size: (u32, u32),
    pub mask_params: MaskParams,
    pub screenshots_dir: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_size: (1280, 720),
            reference_size: (roi_regions::REFERENCE_WIDTH, roi_regions::REFERENCE_HEIGHT),
            mask_params: MaskParams::default(),
            screenshots_dir: PathBuf::from("screenshots"),
        }
    }
}

/// Everything one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: GateOutcome,
    /// Reports that carried a command, in application order
    pub reports: Vec<ControlReport>,
    pub state: MotorState,
}

impl TickReport {
    pub fn commands(&self) -> Vec<MotorCommand> {
        self.reports
            .iter()
            .filter_map(|r| r.transition.command)
            .collect()
    }

    pub fn link_failures(&self) -> usize {
        self.reports.iter().filter(|r| r.link_failed()).count()
    }
}

/// Owns the selected mask's grid, the gate, and the motor controller
///
/// Each [`ControlSession::tick`] gates the frame against the current grid,
/// feeds the result to the automatic triggers, then applies intents queued
/// since the previous tick in arrival order.
pub struct ControlSession<L: MotorLink, S: SnapshotSink> {
    document: RegionDocument,
    selected: Option<String>,
    grid: Arc<OccupancyGrid>,
    gate: DetectionGate,
    controller: MotorController<L>,
    pending: VecDeque<Intent>,
    sink: S,
    settings: SessionSettings,
}

impl<L: MotorLink, S: SnapshotSink> ControlSession<L, S> {
    /// Build a session with `mask` selected, or the first mask by name
    pub fn new(
        document: RegionDocument,
        mask: Option<&str>,
        settings: SessionSettings,
        gate: DetectionGate,
        controller: MotorController<L>,
        sink: S,
    ) -> Result<Self, RuntimeError> {
        let selected = match mask {
            Some(name) => {
                document.mask(name)?;
                Some(name.to_string())
            }
            None => document.first_mask_name().map(str::to_string),
        };

        let grid = match &selected {
            Some(name) => build_grid(&document, name, &settings)?,
            None => {
                warn!("Region document has no masks, nothing will be gated");
                let (w, h) = settings.frame_size;
                OccupancyGrid::empty(w, h)?
            }
        };

        Ok(Self {
            document,
            selected,
            grid: Arc::new(grid),
            gate,
            controller,
            pending: VecDeque::new(),
            sink,
            settings,
        })
    }

    pub fn selected_mask(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Grid currently gated against
    pub fn grid(&self) -> Arc<OccupancyGrid> {
        Arc::clone(&self.grid)
    }

    pub fn gate_mut(&mut self) -> &mut DetectionGate {
        &mut self.gate
    }

    pub fn controller(&self) -> &MotorController<L> {
        &self.controller
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn pending_intents(&self) -> usize {
        self.pending.len()
    }

    /// Switch masks
    ///
    /// The new grid is built completely before it replaces the old one; on
    /// error the previous mask stays selected.
    pub fn select_mask(&mut self, name: &str) -> Result<(), RuntimeError> {
        let grid = build_grid(&self.document, name, &self.settings)?;
        self.grid = Arc::new(grid);
        self.selected = Some(name.to_string());
        info!("Selected mask '{}'", name);
        Ok(())
    }

    /// Queue an operator intent for the next tick
    pub fn queue_intent(&mut self, intent: Intent) {
        debug!("Queued {:?}", intent);
        self.pending.push_back(intent);
    }

    /// Process one frame
    pub async fn tick(&mut self, detections: &[Detection]) -> TickReport {
        let outcome = self.gate.evaluate(detections, &self.grid);
        let mut reports = Vec::new();

        let report = self
            .controller
            .handle(ControlEvent::FrameTick {
                any_inside: outcome.any_inside,
            })
            .await;
        if report.transition.snapshot_requested {
            self.sink.request(SnapshotRequest::new(
                &self.settings.screenshots_dir,
                Local::now(),
                true,
                outcome.qualifying.len(),
            ));
        }
        if report.transition.command.is_some() {
            reports.push(report);
        }

        reports.extend(self.drain_intents().await);

        TickReport {
            outcome,
            reports,
            state: self.controller.machine().state(),
        }
    }

    /// Apply queued intents without a frame
    pub async fn flush_intents(&mut self) -> Vec<ControlReport> {
        self.drain_intents().await
    }

    async fn drain_intents(&mut self) -> Vec<ControlReport> {
        let mut reports = Vec::new();
        while let Some(intent) = self.pending.pop_front() {
            let report = self.controller.handle(intent.into()).await;
            if report.transition.command.is_some() {
                reports.push(report);
            }
        }
        reports
    }

    /// Apply an intent right away, ahead of the queue
    ///
    /// For stops that cannot wait for a frame, such as the watchdog's.
    pub async fn apply_immediately(&mut self, intent: Intent) -> ControlReport {
        self.controller.handle(intent.into()).await
    }

    /// Operator-requested snapshot of the current frame
    pub fn request_snapshot(&mut self) {
        self.sink.request(SnapshotRequest::new(
            &self.settings.screenshots_dir,
            Local::now(),
            false,
            0,
        ));
    }
}

fn build_grid(
    document: &RegionDocument,
    name: &str,
    settings: &SessionSettings,
) -> Result<OccupancyGrid, RuntimeError> {
    let mask = document.mask(name)?;
    let (width, height) = settings.frame_size;
    let polygons: Vec<_> = mask
        .polygons()
        .map(|p| p.scaled(settings.reference_size, settings.frame_size))
        .collect();

    let grid = rasterize(&polygons, width, height, settings.mask_params)?;
    debug!(
        "Built grid for '{}': {} region(s), {} occupied cell(s)",
        name,
        polygons.len(),
        grid.occupied_count()
    );
    Ok(grid)
}
