//! Actuator links
//!
//! A link only moves encoded commands; it holds no control state.

use crate::{LinkError, MotorCommand};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Time the board needs after the port opens (it resets on connect)
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Write timeout for one command
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

/// Destination for motor commands
#[allow(async_fn_in_trait)]
pub trait MotorLink {
    /// Deliver one command
    async fn send(&mut self, command: &MotorCommand) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;

    /// Human-readable endpoint name
    fn endpoint(&self) -> &str;
}

/// Serial link to the motor board
pub struct SerialLink {
    device: String,
    port: Option<SerialStream>,
    write_timeout: Duration,
}

impl SerialLink {
    /// Open the serial port and wait for the board to settle
    ///
    /// A port that cannot be opened yields a disconnected link; every send
    /// then fails with [`LinkError::NotConnected`] and the caller keeps
    /// running without an actuator.
    pub async fn open(device: &str, baud_rate: u32, settle: Duration) -> Self {
        info!("Opening motor link on {} at {} baud", device, baud_rate);

        match tokio_serial::new(device, baud_rate).open_native_async() {
            Ok(port) => {
                tokio::time::sleep(settle).await;
                info!("Motor board connected on {}", device);
                Self {
                    device: device.to_string(),
                    port: Some(port),
                    write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
                }
            }
            Err(e) => {
                warn!("Failed to open {}: {}. Running without motor board.", device, e);
                Self::disconnected(device)
            }
        }
    }

    /// Link with no port behind it
    pub fn disconnected(device: &str) -> Self {
        Self {
            device: device.to_string(),
            port: None,
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}

impl MotorLink for SerialLink {
    async fn send(&mut self, command: &MotorCommand) -> Result<(), LinkError> {
        let Some(port) = self.port.as_mut() else {
            return Err(LinkError::NotConnected(self.device.clone()));
        };

        let frame = command.encode();
        let write = async {
            port.write_all(frame.as_bytes()).await?;
            port.flush().await
        };
        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| LinkError::Timeout(self.write_timeout.as_millis() as u64))??;

        debug!("Wrote {} to {}", command, self.device);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.device
    }
}

/// Commands a [`RecordingLink`] keeps by default
pub const DEFAULT_RECORD_LIMIT: usize = 1024;

/// In-memory link that records delivered commands
///
/// Used for dry runs and tests. Only the most recent `limit` commands are
/// kept; `total_sent` counts all of them. Can be switched to disconnected to
/// exercise delivery failures.
#[derive(Debug)]
pub struct RecordingLink {
    sent: VecDeque<MotorCommand>,
    limit: usize,
    total: usize,
    disconnected: bool,
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self::with_limit(DEFAULT_RECORD_LIMIT)
    }
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` commands (at least one)
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            sent: VecDeque::with_capacity(limit.min(DEFAULT_RECORD_LIMIT)),
            limit,
            total: 0,
            disconnected: false,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.disconnected = !connected;
    }

    /// Retained commands, oldest first
    pub fn sent(&self) -> Vec<MotorCommand> {
        self.sent.iter().copied().collect()
    }

    /// Every command delivered, including ones no longer retained
    pub fn total_sent(&self) -> usize {
        self.total
    }

    /// Concatenated wire frames of the retained commands
    pub fn wire(&self) -> String {
        self.sent.iter().map(MotorCommand::encode).collect()
    }
}

impl MotorLink for RecordingLink {
    async fn send(&mut self, command: &MotorCommand) -> Result<(), LinkError> {
        if self.disconnected {
            return Err(LinkError::NotConnected("recording".to_string()));
        }
        debug!("Recorded {}", command);
        if self.sent.len() == self.limit {
            self.sent.pop_front();
        }
        self.sent.push_back(*command);
        self.total += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }

    fn endpoint(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_serial_link() {
        let mut link = SerialLink::disconnected("/dev/ttyACM9");
        assert!(!link.is_connected());
        let err = link.send(&MotorCommand::stop()).await.unwrap_err();
        assert_eq!(err, LinkError::NotConnected("/dev/ttyACM9".to_string()));
    }

    #[tokio::test]
    async fn test_open_missing_device_falls_back() {
        let link = SerialLink::open("/dev/roi-guard-missing", 9600, Duration::ZERO).await;
        assert!(!link.is_connected());
        assert_eq!(link.endpoint(), "/dev/roi-guard-missing");
    }

    #[tokio::test]
    async fn test_recording_link() {
        let mut link = RecordingLink::new();
        link.send(&MotorCommand::run(255)).await.unwrap();
        link.send(&MotorCommand::stop()).await.unwrap();
        assert_eq!(link.wire(), "1:255\n0:0\n");

        link.set_connected(false);
        assert!(link.send(&MotorCommand::run(1)).await.is_err());
        assert_eq!(link.sent().len(), 2);
        assert_eq!(link.total_sent(), 2);
    }

    #[tokio::test]
    async fn test_recording_link_keeps_recent_commands() {
        let mut link = RecordingLink::with_limit(3);
        for speed in 1..=10 {
            link.send(&MotorCommand::run(speed)).await.unwrap();
        }
        assert_eq!(
            link.sent(),
            vec![
                MotorCommand::run(8),
                MotorCommand::run(9),
                MotorCommand::run(10)
            ]
        );
        assert_eq!(link.total_sent(), 10);
        assert_eq!(link.wire(), "1:8\n1:9\n1:10\n");
    }
}
