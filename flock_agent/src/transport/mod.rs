// flock_agent/src/transport/mod.rs

//! The boundary to the message transport.
//!
//! The agent never talks to a middleware directly. It hands [`Outbound`]
//! records to a [`Transport`], and receives inbound traffic through the
//! per-class queues of [`Inbox`](crate::agent::Inbox).

use flock_core::prelude::VelocityCommand;
use thiserror::Error;

mod loopback;
mod stdio;

pub use loopback::{LoopbackTransport, SwarmBus};
pub use stdio::{
    parse_inbound_line, pump_lines, spawn_stdin_reader, InboundLine, LineError, StdioTransport,
};

/// Name of the shared channel every agent broadcasts its pose on.
pub const POSES_CHANNEL: &str = "poses";
/// Name of the shared free-form message channel.
pub const MESSAGES_CHANNEL: &str = "messages";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("channel '{0}' is closed")]
    Closed(String),
    #[error("failed to write to '{channel}': {source}")]
    Io {
        channel: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything an agent publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Encoded pose broadcast on the shared `poses` channel.
    Pose(String),
    /// Velocity command for the actuation collaborator.
    Velocity(VelocityCommand),
    /// Current controller state label.
    StateMachine(String),
    /// Liveness status.
    Status(String),
    /// Free-form text on the shared `messages` channel.
    Message(String),
    GlobalHeading(f64),
    LocalHeading(f64),
    /// Per-broadcast trace line for operators.
    Debug(String),
    /// The watchdog forced a stop; carries the running total.
    WatchdogElapsed { fired: u64 },
}

impl Outbound {
    /// The channel this record belongs on, qualified by agent name where the
    /// channel is per-agent.
    pub fn channel(&self, agent: &str) -> String {
        match self {
            Outbound::Pose(_) => POSES_CHANNEL.to_string(),
            Outbound::Message(_) => MESSAGES_CHANNEL.to_string(),
            Outbound::Debug(_) => "/debug".to_string(),
            Outbound::Velocity(_) => format!("{}/velocity", agent),
            Outbound::StateMachine(_) => format!("{}/state_machine", agent),
            Outbound::Status(_) => format!("{}/status", agent),
            Outbound::GlobalHeading(_) => format!("{}/global_average_heading", agent),
            Outbound::LocalHeading(_) => format!("{}/local_average_heading", agent),
            Outbound::WatchdogElapsed { .. } => format!("{}/watchdog", agent),
        }
    }

    /// Text rendering of the payload, as a line-oriented bridge would carry it.
    pub fn payload(&self) -> String {
        match self {
            Outbound::Pose(text)
            | Outbound::StateMachine(text)
            | Outbound::Status(text)
            | Outbound::Message(text)
            | Outbound::Debug(text) => text.clone(),
            Outbound::Velocity(cmd) => format!("{} {}", cmd.linear, cmd.angular),
            Outbound::GlobalHeading(h) | Outbound::LocalHeading(h) => h.to_string(),
            Outbound::WatchdogElapsed { fired } => fired.to_string(),
        }
    }
}

/// Publishes agent output. Implementations must not block: the event loop
/// calls this from inside a handler.
pub trait Transport: Send {
    fn publish(&mut self, message: Outbound) -> Result<(), TransportError>;
}

/// Collects everything published. Handy when driving handlers by hand.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub published: Vec<Outbound>,
}

impl RecordingTransport {
    pub fn velocities(&self) -> Vec<VelocityCommand> {
        self.published
            .iter()
            .filter_map(|m| match m {
                Outbound::Velocity(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.published.clear();
    }
}

impl Transport for RecordingTransport {
    fn publish(&mut self, message: Outbound) -> Result<(), TransportError> {
        self.published.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_follow_the_rover_topic_names() {
        assert_eq!(Outbound::Pose(String::new()).channel("ajax"), "poses");
        assert_eq!(
            Outbound::Velocity(VelocityCommand::stop()).channel("ajax"),
            "ajax/velocity"
        );
        assert_eq!(
            Outbound::LocalHeading(0.0).channel("hector"),
            "hector/local_average_heading"
        );
        assert_eq!(Outbound::Debug(String::new()).channel("paris"), "/debug");
    }

    #[test]
    fn velocity_payload_is_space_separated() {
        let payload = Outbound::Velocity(VelocityCommand::new(0.5, -1.25)).payload();
        assert_eq!(payload, "0.5 -1.25");
    }
}
