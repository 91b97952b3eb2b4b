//! Logical actuator commands and their wire form

use serde::{Deserialize, Serialize};
use std::fmt;

/// Run/stop signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Run,
    Stop,
}

impl Signal {
    /// Single-character code understood by the motor board
    pub fn code(self) -> char {
        match self {
            Signal::Run => '1',
            Signal::Stop => '0',
        }
    }
}

/// A `(signal, speed)` pair
///
/// Construct through [`MotorCommand::run`] or [`MotorCommand::stop`]; a stop
/// always carries speed 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotorCommand {
    signal: Signal,
    speed: u8,
}

impl MotorCommand {
    pub const fn run(speed: u8) -> Self {
        Self {
            signal: Signal::Run,
            speed,
        }
    }

    pub const fn stop() -> Self {
        Self {
            signal: Signal::Stop,
            speed: 0,
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn is_stop(&self) -> bool {
        self.signal == Signal::Stop
    }

    /// Line-framed wire encoding `<code>:<speed>\n`
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.signal.code(), self.speed)
    }
}
