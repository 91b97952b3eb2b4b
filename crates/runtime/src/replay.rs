//! JSON-lines replay driver
//!
//! Each line is one event: a frame of raw detector output or an operator
//! action. Frames are rescaled from the detector's input resolution to the
//! grid and ticked through the session; operator intents are queued for the
//! next frame.
//!
//! ```text
//! {"type": "start"}
//! {"type": "frame", "detections": [[70.0, 70.0, 80.0, 80.0, 0.91]]}
//! {"type": "set_speed", "speed": 180}
//! {"type": "select_mask", "name": "line-2"}
//! ```

use crate::session::ControlSession;
use crate::snapshot::SnapshotSink;
use crate::{AppConfig, RuntimeError};
use motor_control::{ControlReport, Intent, MotorLink};
use roi_mask::Detection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One replay line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Detector output for one frame: `[x1, y1, x2, y2, confidence]` at
    /// inference resolution
    Frame {
        #[serde(default)]
        detections: Vec<[f32; 5]>,
    },
    Start,
    Stop,
    SetSpeed {
        speed: u8,
    },
    EnableAutoResume,
    DisableAutoResume,
    SelectMask {
        name: String,
    },
    SetConfidence {
        threshold: f32,
    },
    SetOverlap {
        threshold: f64,
    },
    /// Operator snapshot of the current frame
    Snapshot,
}

/// Parse one line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str, number: usize) -> Result<Option<ReplayEvent>, RuntimeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| RuntimeError::Replay {
            line: number,
            message: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Stop the motor when no frame arrives for this long
    pub watchdog: Option<Duration>,
    /// Pause after each frame to pace playback
    pub frame_interval: Option<Duration>,
    /// Resolution detections are reported at
    pub inference_size: (u32, u32),
    /// Resolution of the occupancy grid
    pub frame_size: (u32, u32),
    /// Where operator setting changes are saved
    pub persist_to: Option<PathBuf>,
    /// Send a final stop when the stream ends
    pub stop_on_exit: bool,
}

impl ReplayOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            watchdog: config.watchdog(),
            frame_interval: None,
            inference_size: config.inference_size(),
            frame_size: config.frame_size(),
            persist_to: None,
            stop_on_exit: true,
        }
    }
}

/// Pause between frames for a playback rate in frames per second
///
/// Rates that are not finite and positive, or so small that the pause does
/// not fit a `Duration`, are rejected.
pub fn frame_interval(fps: f64) -> Result<Duration, RuntimeError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(RuntimeError::InvalidConfig(format!(
            "fps must be positive, got {}",
            fps
        )));
    }
    Duration::try_from_secs_f64(1.0 / fps)
        .map_err(|_| RuntimeError::InvalidConfig(format!("fps {} is too small", fps)))
}

/// Counters for one replay run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub intents: usize,
    pub commands: usize,
    pub link_failures: usize,
    pub watchdog_stops: usize,
    /// Lines or actions that were rejected and skipped
    pub rejected: usize,
}

impl ReplaySummary {
    fn record(&mut self, report: &ControlReport) {
        if report.transition.command.is_some() {
            self.commands += 1;
        }
        if report.link_failed() {
            self.link_failures += 1;
        }
    }
}

/// Drive a session from a JSON-lines stream until it ends
///
/// Operator changes to speed and thresholds are written into `config` and,
/// when `persist_to` is set, saved there. Malformed lines are logged and
/// skipped.
pub async fn run_replay<R, L, S>(
    session: &mut ControlSession<L, S>,
    config: &mut AppConfig,
    reader: R,
    options: &ReplayOptions,
) -> Result<ReplaySummary, RuntimeError>
where
    R: AsyncBufRead + Unpin,
    L: MotorLink,
    S: SnapshotSink,
{
    let mut lines = reader.lines();
    let mut summary = ReplaySummary::default();
    let mut number = 0;
    let mut last_frame = Instant::now();
    let mut watchdog_fired = false;

    loop {
        let next = match options.watchdog {
            Some(limit) if !watchdog_fired => {
                match tokio::time::timeout_at(last_frame + limit, lines.next_line()).await {
                    Ok(line) => line?,
                    Err(_) => {
                        warn!("No frame for {}ms, stopping motor", limit.as_millis());
                        let report = session.apply_immediately(Intent::Stop).await;
                        summary.record(&report);
                        summary.watchdog_stops += 1;
                        watchdog_fired = true;
                        continue;
                    }
                }
            }
            _ => lines.next_line().await?,
        };
        let Some(line) = next else { break };
        number += 1;

        let event = match parse_line(&line, number) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping {}", e);
                summary.rejected += 1;
                continue;
            }
        };

        match event {
            ReplayEvent::Frame { detections } => {
                let detections: Vec<Detection> = detections
                    .iter()
                    .map(|&[x1, y1, x2, y2, confidence]| {
                        Detection::from_model_output(
                            [x1, y1, x2, y2],
                            confidence,
                            options.inference_size,
                            options.frame_size,
                        )
                    })
                    .collect();

                let report = session.tick(&detections).await;
                for r in &report.reports {
                    summary.record(r);
                }
                summary.frames += 1;
                last_frame = Instant::now();
                watchdog_fired = false;

                if let Some(interval) = options.frame_interval {
                    tokio::time::sleep(interval).await;
                }
            }
            ReplayEvent::Start => queue(session, &mut summary, Intent::Start),
            ReplayEvent::Stop => queue(session, &mut summary, Intent::Stop),
            ReplayEvent::EnableAutoResume => {
                queue(session, &mut summary, Intent::EnableAutoResume)
            }
            ReplayEvent::DisableAutoResume => {
                queue(session, &mut summary, Intent::DisableAutoResume)
            }
            ReplayEvent::SetSpeed { speed } => {
                queue(session, &mut summary, Intent::SetSpeed(speed));
                config.motor_speed = speed;
                persist(config, options);
            }
            ReplayEvent::SelectMask { name } => match session.select_mask(&name) {
                Ok(()) => config.mask = Some(name),
                Err(e) => {
                    warn!("Cannot select mask: {}", e);
                    summary.rejected += 1;
                }
            },
            ReplayEvent::SetConfidence { threshold } => {
                match session.gate_mut().set_confidence_threshold(threshold) {
                    Ok(()) => {
                        config.confidence_threshold = threshold;
                        persist(config, options);
                    }
                    Err(e) => {
                        warn!("Rejected confidence threshold: {}", e);
                        summary.rejected += 1;
                    }
                }
            }
            ReplayEvent::SetOverlap { threshold } => {
                match session.gate_mut().set_overlap_threshold(threshold) {
                    Ok(()) => {
                        config.overlap_threshold = threshold;
                        persist(config, options);
                    }
                    Err(e) => {
                        warn!("Rejected overlap threshold: {}", e);
                        summary.rejected += 1;
                    }
                }
            }
            ReplayEvent::Snapshot => session.request_snapshot(),
        }
    }

    for report in session.flush_intents().await {
        summary.record(&report);
    }
    if options.stop_on_exit {
        let report = session.apply_immediately(Intent::Stop).await;
        summary.record(&report);
    }

    info!(
        "Replay finished: {} frame(s), {} intent(s), {} command(s), {} link failure(s)",
        summary.frames, summary.intents, summary.commands, summary.link_failures
    );
    Ok(summary)
}

fn queue<L: MotorLink, S: SnapshotSink>(
    session: &mut ControlSession<L, S>,
    summary: &mut ReplaySummary,
    intent: Intent,
) {
    session.queue_intent(intent);
    summary.intents += 1;
}

fn persist(config: &AppConfig, options: &ReplayOptions) {
    let Some(path) = &options.persist_to else {
        return;
    };
    match config.save_operator_settings(path) {
        Ok(()) => debug!("Persisted operator settings"),
        Err(e) => warn!("Failed to save configuration: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSettings;
    use crate::snapshot::SnapshotRequest;
    use motor_control::{MotorCommand, MotorConfig, MotorController, MotorStateMachine, RecordingLink};
    use roi_mask::{DetectionGate, GateConfig};
    use roi_regions::{Point, Polygon, RegionDocument};
    use tokio::io::AsyncWriteExt;

    type TestSession = ControlSession<RecordingLink, Vec<SnapshotRequest>>;

    fn session(config: &AppConfig) -> TestSession {
        let mut doc = RegionDocument::new();
        doc.add_mask("line-1").unwrap();
        doc.insert_region(
            "line-1",
            "region-1",
            Polygon::new(vec![
                Point::new(100, 100),
                Point::new(200, 100),
                Point::new(200, 200),
                Point::new(100, 200),
            ])
            .unwrap(),
        )
        .unwrap();

        ControlSession::new(
            doc,
            None,
            SessionSettings::default(),
            DetectionGate::new(config.gate_config()).unwrap(),
            MotorController::new(
                MotorStateMachine::new(config.motor_config()),
                RecordingLink::new(),
            ),
            Vec::new(),
        )
        .unwrap()
    }

    fn options() -> ReplayOptions {
        ReplayOptions {
            stop_on_exit: false,
            ..ReplayOptions::from_config(&AppConfig::default())
        }
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("", 1).unwrap(), None);
        assert_eq!(parse_line("  # comment", 2).unwrap(), None);
        assert_eq!(parse_line(r#"{"type":"start"}"#, 3).unwrap(), Some(ReplayEvent::Start));
        assert_eq!(
            parse_line(r#"{"type":"set_speed","speed":120}"#, 4).unwrap(),
            Some(ReplayEvent::SetSpeed { speed: 120 })
        );
        assert_eq!(
            parse_line(r#"{"type":"frame"}"#, 5).unwrap(),
            Some(ReplayEvent::Frame { detections: vec![] })
        );
        assert!(matches!(
            parse_line(r#"{"type":"warp"}"#, 6),
            Err(RuntimeError::Replay { line: 6, .. })
        ));
    }

    #[tokio::test]
    async fn test_replay_start_then_detection() {
        let mut config = AppConfig {
            motor_speed: 200,
            ..AppConfig::default()
        };
        let mut s = session(&config);
        let script = concat!(
            "{\"type\":\"start\"}\n",
            "{\"type\":\"frame\",\"detections\":[]}\n",
            "# detector coordinates are at 640x360\n",
            "{\"type\":\"frame\",\"detections\":[[70.0,70.0,80.0,80.0,0.9]]}\n",
            "{\"type\":\"frame\",\"detections\":[[70.0,70.0,80.0,80.0,0.9]]}\n",
        );

        let summary = run_replay(&mut s, &mut config, script.as_bytes(), &options())
            .await
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.intents, 1);
        assert_eq!(summary.commands, 2);
        assert_eq!(
            s.controller().link().sent(),
            &[MotorCommand::run(200), MotorCommand::stop()]
        );
        assert_eq!(s.sink().len(), 1);
    }

    #[tokio::test]
    async fn test_trailing_intents_flushed_and_stop_on_exit() {
        let mut config = AppConfig::default();
        let mut s = session(&config);
        let opts = ReplayOptions {
            stop_on_exit: true,
            ..options()
        };

        let summary = run_replay(&mut s, &mut config, "{\"type\":\"start\"}\n".as_bytes(), &opts)
            .await
            .unwrap();

        assert_eq!(summary.commands, 2);
        assert_eq!(s.controller().link().wire(), "1:255\n0:0\n");
    }

    #[tokio::test]
    async fn test_bad_lines_and_unknown_mask_rejected() {
        let mut config = AppConfig::default();
        let mut s = session(&config);
        let script = concat!(
            "not json\n",
            "{\"type\":\"select_mask\",\"name\":\"missing\"}\n",
            "{\"type\":\"set_overlap\",\"threshold\":2.0}\n",
            "{\"type\":\"frame\"}\n",
        );

        let summary = run_replay(&mut s, &mut config, script.as_bytes(), &options())
            .await
            .unwrap();

        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.frames, 1);
        assert_eq!(s.selected_mask(), Some("line-1"));
        assert_eq!(config.mask, None);
    }

    #[test]
    fn test_frame_interval_from_fps() {
        assert_eq!(frame_interval(10.0).unwrap(), Duration::from_millis(100));
        assert!(frame_interval(0.0).is_err());
        assert!(frame_interval(-5.0).is_err());
        assert!(frame_interval(f64::NAN).is_err());
        assert!(frame_interval(1e-20).is_err());
    }

    #[tokio::test]
    async fn test_operator_settings_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi-guard.json");
        let mut config = AppConfig::default();
        let mut s = session(&config);
        let opts = ReplayOptions {
            persist_to: Some(path.clone()),
            ..options()
        };
        let script = concat!(
            "{\"type\":\"set_speed\",\"speed\":90}\n",
            "{\"type\":\"set_confidence\",\"threshold\":0.6}\n",
        );

        run_replay(&mut s, &mut config, script.as_bytes(), &opts)
            .await
            .unwrap();

        assert_eq!(config.motor_speed, 90);
        let saved = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(saved.motor_speed, 90);
        assert_eq!(saved.confidence_threshold, 0.6);
        assert_eq!(s.controller().machine().speed(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_stops_on_missing_frames() {
        let mut config = AppConfig::default();
        let mut s = session(&config);
        let opts = ReplayOptions {
            watchdog: Some(Duration::from_secs(1)),
            ..options()
        };

        let (mut writer, reader) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            writer
                .write_all(b"{\"type\":\"start\"}\n{\"type\":\"frame\"}\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let summary = run_replay(&mut s, &mut config, tokio::io::BufReader::new(reader), &opts)
            .await
            .unwrap();

        assert_eq!(summary.watchdog_stops, 1);
        assert_eq!(s.controller().link().wire(), "1:255\n0:0\n");
    }
}
