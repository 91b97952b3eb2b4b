//! Motor run/stop state machine
//!
//! All transitions go through [`MotorStateMachine::handle`]. Automatic
//! triggers are edge-triggered against the last emitted command rather than
//! the logical state, so a condition that persists across frames produces a
//! single command.

use crate::MotorCommand;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Logical motor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotorState {
    #[default]
    Stopped,
    Running,
}

/// Operator intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Start,
    Stop,
    SetSpeed(u8),
    EnableAutoResume,
    DisableAutoResume,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Intent(Intent),
    /// Gate result for the frame just evaluated
    FrameTick { any_inside: bool },
}

impl From<Intent> for ControlEvent {
    fn from(intent: Intent) -> Self {
        ControlEvent::Intent(intent)
    }
}

/// Outcome of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Command to deliver, if any
    pub command: Option<MotorCommand>,
    /// Set when the command came from a detection trigger
    pub automatic: bool,
    /// A snapshot of the current frame should be taken
    pub snapshot_requested: bool,
    /// State after the event
    pub state: MotorState,
}

/// Initial machine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Speed carried by run commands
    pub speed: u8,
    /// Resume automatically once the regions are clear
    pub auto_resume: bool,
    /// Request a snapshot on every automatic stop
    pub auto_snapshot: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            speed: 255,
            auto_resume: false,
            auto_snapshot: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotorStateMachine {
    state: MotorState,
    last_command: Option<MotorCommand>,
    auto_resume: bool,
    speed: u8,
    auto_snapshot: bool,
}

impl MotorStateMachine {
    /// New machine in `Stopped` with nothing emitted yet
    pub fn new(config: MotorConfig) -> Self {
        Self {
            state: MotorState::Stopped,
            last_command: None,
            auto_resume: config.auto_resume,
            speed: config.speed,
            auto_snapshot: config.auto_snapshot,
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn last_command(&self) -> Option<MotorCommand> {
        self.last_command
    }

    pub fn auto_resume(&self) -> bool {
        self.auto_resume
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn auto_snapshot(&self) -> bool {
        self.auto_snapshot
    }

    fn last_was_stop(&self) -> bool {
        matches!(self.last_command, Some(c) if c.is_stop())
    }

    fn last_was_run(&self) -> bool {
        matches!(self.last_command, Some(c) if !c.is_stop())
    }

    /// Apply one event
    pub fn handle(&mut self, event: ControlEvent) -> Transition {
        let (command, automatic) = match event {
            ControlEvent::FrameTick { any_inside } => (self.on_frame(any_inside), true),
            ControlEvent::Intent(intent) => (self.on_intent(intent), false),
        };

        if let Some(cmd) = command {
            self.last_command = Some(cmd);
            self.state = if cmd.is_stop() {
                MotorState::Stopped
            } else {
                MotorState::Running
            };
        }

        Transition {
            command,
            automatic,
            snapshot_requested: automatic
                && self.auto_snapshot
                && command.map_or(false, |c| c.is_stop()),
            state: self.state,
        }
    }

    fn on_frame(&mut self, any_inside: bool) -> Option<MotorCommand> {
        if any_inside && self.state == MotorState::Running && !self.last_was_stop() {
            info!("Object inside region, pausing motor");
            return Some(MotorCommand::stop());
        }
        if !any_inside && self.auto_resume && self.last_was_stop() {
            info!("Regions clear, resuming motor at speed {}", self.speed);
            return Some(MotorCommand::run(self.speed));
        }
        None
    }

    fn on_intent(&mut self, intent: Intent) -> Option<MotorCommand> {
        match intent {
            Intent::Start => {
                let run = MotorCommand::run(self.speed);
                if self.last_command == Some(run) {
                    debug!("Start ignored, already running at {}", self.speed);
                    return None;
                }
                Some(run)
            }
            Intent::Stop => {
                // An operator stop must not be undone by the next clear frame
                if self.auto_resume {
                    info!("Manual stop, disabling auto-resume");
                    self.auto_resume = false;
                }
                if self.last_was_stop() {
                    debug!("Stop ignored, already stopped");
                    return None;
                }
                Some(MotorCommand::stop())
            }
            Intent::SetSpeed(speed) => {
                let changed = speed != self.speed;
                self.speed = speed;
                (changed && self.last_was_run()).then(|| MotorCommand::run(speed))
            }
            Intent::EnableAutoResume => {
                self.auto_resume = true;
                None
            }
            Intent::DisableAutoResume => {
                self.auto_resume = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn machine(speed: u8, auto_resume: bool) -> MotorStateMachine {
        MotorStateMachine::new(MotorConfig {
            speed,
            auto_resume,
            auto_snapshot: true,
        })
    }

    fn tick(any_inside: bool) -> ControlEvent {
        ControlEvent::FrameTick { any_inside }
    }

    #[test]
    fn test_start_then_detection_stops_once() {
        let mut m = machine(200, false);

        let t = m.handle(Intent::Start.into());
        assert_eq!(t.command, Some(MotorCommand::run(200)));
        assert_eq!(t.state, MotorState::Running);

        let t = m.handle(tick(true));
        assert_eq!(t.command, Some(MotorCommand::stop()));
        assert_eq!(t.command.map(|c| c.speed()), Some(0));
        assert_eq!(t.state, MotorState::Stopped);
        assert!(t.automatic);
        assert!(t.snapshot_requested);

        let t = m.handle(tick(true));
        assert_eq!(t.command, None);
        assert!(!t.snapshot_requested);
    }

    #[test]
    fn test_auto_resume_after_clear_frame() {
        let mut m = machine(180, true);
        m.handle(Intent::Start.into());
        m.handle(tick(true));
        assert_eq!(m.last_command(), Some(MotorCommand::stop()));

        let t = m.handle(tick(false));
        assert_eq!(t.command, Some(MotorCommand::run(180)));
        assert_eq!(t.state, MotorState::Running);
        assert!(!t.snapshot_requested);
    }

    #[test]
    fn test_no_auto_resume_when_disabled() {
        let mut m = machine(180, false);
        m.handle(Intent::Start.into());
        m.handle(tick(true));
        assert_eq!(m.handle(tick(false)).command, None);
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn test_no_auto_resume_before_any_command() {
        let mut m = machine(100, true);
        assert_eq!(m.handle(tick(false)).command, None);
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn test_running_without_detection_is_silent() {
        let mut m = machine(100, true);
        m.handle(Intent::Start.into());
        for _ in 0..10 {
            assert_eq!(m.handle(tick(false)).command, None);
        }
        assert_eq!(m.state(), MotorState::Running);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut m = machine(100, false);
        m.handle(Intent::Start.into());

        assert_eq!(m.handle(Intent::Stop.into()).command, Some(MotorCommand::stop()));
        assert_eq!(m.handle(Intent::Stop.into()).command, None);
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn test_manual_stop_never_requests_snapshot() {
        let mut m = machine(100, false);
        m.handle(Intent::Start.into());
        let t = m.handle(Intent::Stop.into());
        assert!(!t.automatic);
        assert!(!t.snapshot_requested);
    }

    #[test]
    fn test_manual_stop_clears_auto_resume() {
        let mut m = machine(100, true);
        m.handle(Intent::Start.into());
        m.handle(Intent::Stop.into());
        assert!(!m.auto_resume());
        assert_eq!(m.handle(tick(false)).command, None);
    }

    #[test]
    fn test_set_speed_reapplied_while_running() {
        let mut m = machine(100, false);
        assert_eq!(m.handle(Intent::SetSpeed(120).into()).command, None);

        m.handle(Intent::Start.into());
        assert_eq!(m.last_command(), Some(MotorCommand::run(120)));

        let t = m.handle(Intent::SetSpeed(90).into());
        assert_eq!(t.command, Some(MotorCommand::run(90)));
        assert_eq!(t.state, MotorState::Running);
        assert_eq!(m.handle(Intent::SetSpeed(90).into()).command, None);
    }

    #[test]
    fn test_set_speed_while_stopped_used_on_next_start() {
        let mut m = machine(100, false);
        m.handle(Intent::Start.into());
        m.handle(Intent::Stop.into());
        assert_eq!(m.handle(Intent::SetSpeed(50).into()).command, None);
        assert_eq!(m.handle(Intent::Start.into()).command, Some(MotorCommand::run(50)));
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let mut m = machine(100, false);
        m.handle(Intent::Start.into());
        assert_eq!(m.handle(Intent::Start.into()).command, None);
    }

    #[test]
    fn test_auto_snapshot_option() {
        let mut m = MotorStateMachine::new(MotorConfig {
            speed: 100,
            auto_resume: false,
            auto_snapshot: false,
        });
        m.handle(Intent::Start.into());
        let t = m.handle(tick(true));
        assert_eq!(t.command, Some(MotorCommand::stop()));
        assert!(!t.snapshot_requested);
    }

    #[test]
    fn test_auto_resume_toggle() {
        let mut m = machine(100, false);
        assert_eq!(m.handle(Intent::EnableAutoResume.into()).command, None);
        assert!(m.auto_resume());
        m.handle(Intent::DisableAutoResume.into());
        assert!(!m.auto_resume());
        assert_eq!(m.state(), MotorState::Stopped);
    }

    fn arb_event() -> impl Strategy<Value = ControlEvent> {
        prop_oneof![
            any::<bool>().prop_map(|any_inside| ControlEvent::FrameTick { any_inside }),
            Just(ControlEvent::Intent(Intent::Start)),
            Just(ControlEvent::Intent(Intent::Stop)),
            any::<u8>().prop_map(|s| ControlEvent::Intent(Intent::SetSpeed(s))),
            Just(ControlEvent::Intent(Intent::EnableAutoResume)),
            Just(ControlEvent::Intent(Intent::DisableAutoResume)),
        ]
    }

    proptest! {
        #[test]
        fn prop_never_emits_same_command_twice_in_a_row(
            events in proptest::collection::vec(arb_event(), 1..80)
        ) {
            let mut m = machine(200, false);
            let mut previous: Option<MotorCommand> = None;
            for event in events {
                if let Some(cmd) = m.handle(event).command {
                    prop_assert_ne!(Some(cmd), previous);
                    if cmd.is_stop() {
                        prop_assert_eq!(cmd.speed(), 0);
                    } else {
                        prop_assert_eq!(cmd.speed(), m.speed());
                    }
                    previous = Some(cmd);
                }
            }
        }

        #[test]
        fn prop_state_matches_last_command(
            events in proptest::collection::vec(arb_event(), 1..80)
        ) {
            let mut m = machine(200, true);
            for event in events {
                m.handle(event);
                let running = matches!(m.last_command(), Some(c) if !c.is_stop());
                prop_assert_eq!(m.state() == MotorState::Running, running);
            }
        }
    }
}
