//! ROI Guard Runtime
//!
//! Per-frame control loop tying the region document, the detection gate,
//! and the motor controller together:
//! - Layered configuration (file, then `ROI_GUARD__*` environment)
//! - Logging setup
//! - `ControlSession`, the fixed gate -> triggers -> intents tick order
//! - JSON-lines replay driver with an optional missed-frame watchdog

pub mod config;
pub mod logging;
pub mod replay;
pub mod session;
pub mod snapshot;

pub use config::AppConfig;
pub use logging::init_logging;
pub use replay::{frame_interval, parse_line, run_replay, ReplayEvent, ReplayOptions, ReplaySummary};
pub use session::{ControlSession, SessionSettings, TickReport};
pub use snapshot::{LogSnapshotSink, SnapshotRequest, SnapshotSink};

use roi_mask::MaskError;
use roi_regions::RegionError;
use thiserror::Error;

/// Runtime error types
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error("Replay line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
