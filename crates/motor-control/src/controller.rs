//! State machine plus link

use crate::{ControlEvent, LinkError, MotorLink, MotorStateMachine, Transition};
use tracing::{info, warn};

/// What happened to the command of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The transition emitted nothing
    Idle,
    Sent,
    /// The link rejected the command; the transition still stands
    Failed(LinkError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlReport {
    pub transition: Transition,
    pub delivery: Delivery,
}

impl ControlReport {
    pub fn link_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed(_))
    }
}

/// Drives a state machine and forwards its commands to a link
///
/// Delivery is optimistic: a failed send is reported but neither retried nor
/// rolled back.
pub struct MotorController<L: MotorLink> {
    machine: MotorStateMachine,
    link: L,
}

impl<L: MotorLink> MotorController<L> {
    pub fn new(machine: MotorStateMachine, link: L) -> Self {
        info!("Motor controller using link {}", link.endpoint());
        Self { machine, link }
    }

    pub fn machine(&self) -> &MotorStateMachine {
        &self.machine
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Apply an event and deliver the resulting command
    pub async fn handle(&mut self, event: ControlEvent) -> ControlReport {
        let transition = self.machine.handle(event);

        let delivery = match transition.command {
            None => Delivery::Idle,
            Some(command) => match self.link.send(&command).await {
                Ok(()) => {
                    metrics::counter!("motor_commands_total").increment(1);
                    info!("Sent {}", command);
                    Delivery::Sent
                }
                Err(e) => {
                    metrics::counter!("motor_link_failures_total").increment(1);
                    warn!("Failed to send {}: {}", command, e);
                    Delivery::Failed(e)
                }
            },
        };

        ControlReport {
            transition,
            delivery,
        }
    }
}
