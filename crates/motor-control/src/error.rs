//! Actuator link error types

use thiserror::Error;

/// Errors delivering a command to the motor board
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// No port is open for the device
    #[error("Motor board not connected on {0}")]
    NotConnected(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Write did not complete in time
    #[error("Timeout writing command after {0}ms")]
    Timeout(u64),
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for LinkError {
    fn from(err: tokio_serial::Error) -> Self {
        LinkError::Serial(err.to_string())
    }
}
