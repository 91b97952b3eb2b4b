//! Motor Control
//!
//! Run/stop control of a single motor driven by operator intents and
//! per-frame detection results:
//! - Edge-triggered state machine keyed on the last emitted command
//! - `(signal, speed)` commands and their line-framed wire encoding
//! - Serial and in-memory links with optimistic delivery

mod command;
mod controller;
mod error;
mod link;
mod machine;

pub use command::{MotorCommand, Signal};
pub use controller::{ControlReport, Delivery, MotorController};
pub use error::LinkError;
pub use link::{
    MotorLink, RecordingLink, SerialLink, DEFAULT_RECORD_LIMIT, DEFAULT_SETTLE_MS,
};
pub use machine::{ControlEvent, Intent, MotorConfig, MotorState, MotorStateMachine, Transition};
