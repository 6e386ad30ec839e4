// flock_agent/src/transport/stdio.rs

//! A line-oriented bridge over stdin/stdout.
//!
//! Outbound records are written as `<channel> <payload>`. Inbound lines use
//! the same shape:
//!
//! ```text
//! poses ajax, 1.0, 2.0, 0.5
//! mode 2
//! joystick 0.2 -0.1
//! odom 1.0 2.0 0.5
//! obstacle 1
//! ```

use flock_core::prelude::{Odometry, Pose, VelocityCommand};
use thiserror::Error;
use std::io::BufRead;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Outbound, Transport, TransportError};
use crate::agent::AgentInputs;

#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    #[error("malformed payload for '{channel}': '{payload}'")]
    Malformed { channel: String, payload: String },
}

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundLine {
    Pose(String),
    Mode(u8),
    Manual(VelocityCommand),
    Odometry(Odometry),
    Obstacle(u8),
}

pub fn parse_inbound_line(line: &str) -> Result<InboundLine, LineError> {
    let line = line.trim();
    let (channel, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let payload = payload.trim();
    let malformed = || LineError::Malformed {
        channel: channel.to_string(),
        payload: payload.to_string(),
    };

    match channel {
        // The pose text is left for the codec to judge.
        "poses" => Ok(InboundLine::Pose(payload.to_string())),
        "mode" => payload.parse().map(InboundLine::Mode).map_err(|_| malformed()),
        "obstacle" => payload
            .parse()
            .map(InboundLine::Obstacle)
            .map_err(|_| malformed()),
        "joystick" => match numbers(payload).as_deref() {
            Some([linear, angular]) => {
                Ok(InboundLine::Manual(VelocityCommand::new(*linear, *angular)))
            }
            _ => Err(malformed()),
        },
        "odom" => match numbers(payload).as_deref() {
            Some([x, y, yaw]) => Ok(InboundLine::Odometry(Odometry::from_pose(&Pose::new(
                *x, *y, *yaw,
            )))),
            _ => Err(malformed()),
        },
        other => Err(LineError::UnknownChannel(other.to_string())),
    }
}

fn numbers(payload: &str) -> Option<Vec<f64>> {
    payload
        .split_whitespace()
        .map(|n| n.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

/// Reads `reader` until EOF, routing each line into the agent's inbound
/// queues. Blocks the calling thread; returns when the input ends or the agent
/// stops listening.
pub fn pump_lines<R: BufRead>(reader: R, inputs: &AgentInputs) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let delivered = match parse_inbound_line(&line) {
            Ok(InboundLine::Pose(text)) => inputs.poses.blocking_send(text).is_ok(),
            Ok(InboundLine::Mode(code)) => inputs.modes.blocking_send(code).is_ok(),
            Ok(InboundLine::Manual(cmd)) => inputs.manual.blocking_send(cmd).is_ok(),
            Ok(InboundLine::Odometry(odom)) => inputs.odometry.blocking_send(odom).is_ok(),
            Ok(InboundLine::Obstacle(code)) => inputs.obstacles.blocking_send(code).is_ok(),
            Err(e) => {
                warn!("Ignoring inbound line: {}", e);
                true
            }
        };
        if !delivered {
            debug!("Agent stopped listening; closing stdin bridge");
            break;
        }
    }
}

/// Bridges stdin into the agent from a dedicated OS thread.
///
/// A read blocked on tokio's stdin cannot be cancelled and holds up runtime
/// shutdown; a detached thread does not. The returned receiver completes when
/// stdin reaches EOF or the agent stops listening.
pub fn spawn_stdin_reader(inputs: AgentInputs) -> std::io::Result<oneshot::Receiver<()>> {
    let (done, closed) = oneshot::channel();
    std::thread::Builder::new()
        .name("stdin-bridge".to_string())
        .spawn(move || {
            pump_lines(std::io::stdin().lock(), &inputs);
            let _ = done.send(());
        })?;
    Ok(closed)
}

/// Writes outbound records to stdout from a separate task so that a slow
/// reader never stalls the agent.
#[derive(Debug)]
pub struct StdioTransport {
    agent: String,
    lines: mpsc::UnboundedSender<String>,
}

impl StdioTransport {
    pub fn spawn(agent: &str) -> (Self, JoinHandle<()>) {
        let (lines, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(line) = rx.recv().await {
                if let Err(e) = stdout.write_all(line.as_bytes()).await {
                    warn!("stdout write failed: {}", e);
                    break;
                }
            }
            let _ = stdout.flush().await;
        });
        (
            Self {
                agent: agent.to_string(),
                lines,
            },
            writer,
        )
    }
}

impl Transport for StdioTransport {
    fn publish(&mut self, message: Outbound) -> Result<(), TransportError> {
        let channel = message.channel(&self.agent);
        let line = format!("{} {}\n", channel, message.payload());
        self.lines
            .send(line)
            .map_err(|_| TransportError::Closed(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn parses_each_channel() {
        assert_eq!(
            parse_inbound_line("poses ajax, 1, 2, 3"),
            Ok(InboundLine::Pose("ajax, 1, 2, 3".into()))
        );
        assert_eq!(parse_inbound_line("mode 2"), Ok(InboundLine::Mode(2)));
        assert_eq!(parse_inbound_line("obstacle 1"), Ok(InboundLine::Obstacle(1)));
        assert_eq!(
            parse_inbound_line("  joystick 0.2   -0.1 "),
            Ok(InboundLine::Manual(VelocityCommand::new(0.2, -0.1)))
        );
        match parse_inbound_line("odom 1 2 0.5") {
            Ok(InboundLine::Odometry(odom)) => {
                assert_abs_diff_eq!(odom.pose().theta, 0.5, epsilon = 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pumped_lines_reach_their_queues() {
        let (inputs, mut inbox) = crate::agent::inbox();
        let text = "poses ajax, 1, 2, 3\n\nteleport 9 9\nmode 2\njoystick 0.5 0.25\nobstacle 1\n";

        pump_lines(std::io::Cursor::new(text), &inputs);

        assert_eq!(inbox.poses.try_recv().unwrap(), "ajax, 1, 2, 3");
        assert_eq!(inbox.modes.try_recv().unwrap(), 2);
        assert_eq!(
            inbox.manual.try_recv().unwrap(),
            VelocityCommand::new(0.5, 0.25)
        );
        assert_eq!(inbox.obstacles.try_recv().unwrap(), 1);
        assert!(inbox.odometry.try_recv().is_err());
    }

    #[test]
    fn pump_stops_once_the_agent_is_gone() {
        let (inputs, inbox) = crate::agent::inbox();
        drop(inbox);
        // Returns instead of blocking on the closed queue.
        pump_lines(std::io::Cursor::new("mode 2\nmode 3\n"), &inputs);
    }

    #[test]
    fn rejects_bad_lines() {
        assert_eq!(
            parse_inbound_line("teleport 1 2"),
            Err(LineError::UnknownChannel("teleport".into()))
        );
        assert!(parse_inbound_line("mode 300").is_err());
        assert!(parse_inbound_line("joystick 1").is_err());
        assert!(parse_inbound_line("odom 1 2 nan").is_err());
    }
}
