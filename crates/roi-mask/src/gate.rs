//! Per-frame detection gate

use crate::{Detection, MaskError, OccupancyGrid, OverlapEvaluator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum detector confidence (inclusive)
    pub confidence_threshold: f32,

    /// Minimum overlap fraction for a box to count as inside (inclusive)
    pub overlap_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.45,
            overlap_threshold: 0.10,
        }
    }
}

/// Result of gating one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateOutcome {
    /// At least one confident detection lies inside the regions
    pub any_inside: bool,

    /// Every qualifying detection, in input order
    pub qualifying: Vec<Detection>,
}

/// Decides whether any detection of a frame lies inside the regions
///
/// Stateless across frames.
#[derive(Debug, Clone)]
pub struct DetectionGate {
    confidence_threshold: f32,
    evaluator: OverlapEvaluator,
}

impl DetectionGate {
    pub fn new(config: GateConfig) -> Result<Self, MaskError> {
        check_confidence(config.confidence_threshold)?;
        Ok(Self {
            confidence_threshold: config.confidence_threshold,
            evaluator: OverlapEvaluator::new(config.overlap_threshold)?,
        })
    }

    pub fn config(&self) -> GateConfig {
        GateConfig {
            confidence_threshold: self.confidence_threshold,
            overlap_threshold: self.evaluator.threshold(),
        }
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) -> Result<(), MaskError> {
        check_confidence(threshold)?;
        self.confidence_threshold = threshold;
        Ok(())
    }

    pub fn set_overlap_threshold(&mut self, threshold: f64) -> Result<(), MaskError> {
        self.evaluator = OverlapEvaluator::new(threshold)?;
        Ok(())
    }

    /// Gate one frame's detections against the grid
    ///
    /// Detections below the confidence threshold are ignored.
    pub fn evaluate(&self, detections: &[Detection], grid: &OccupancyGrid) -> GateOutcome {
        let qualifying: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .filter(|d| self.evaluator.is_inside(&d.bbox, grid))
            .copied()
            .collect();

        let any_inside = !qualifying.is_empty();
        if any_inside {
            metrics::counter!("gate_hits_total").increment(1);
            debug!(
                "{} of {} detection(s) inside regions",
                qualifying.len(),
                detections.len()
            );
        }

        GateOutcome {
            any_inside,
            qualifying,
        }
    }
}

fn check_confidence(threshold: f32) -> Result<(), MaskError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(MaskError::InvalidThreshold(threshold as f64));
    }
    Ok(())
}
