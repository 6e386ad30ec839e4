// flock_core/src/types.rs

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// --- Core Identifier ---
/// Slot of a swarm member inside the [`Membership`](crate::membership::Membership) table.
///
/// Only the membership table hands these out, so every `AgentId` in circulation
/// refers to a known member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    /// The slot index, in membership order.
    pub fn index(self) -> usize {
        self.0
    }
}

// --- Pose ---
/// A planar pose: position in consistent distance units and heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    /// The pose every roster slot holds before first contact.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Euclidean distance between the two positions. Heading is ignored.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.position() - self.position()).norm()
    }
}

// --- Actuation ---
/// A velocity command for the actuation channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// The command the watchdog and mode changes emit.
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stop(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn distance_ignores_heading() {
        let a = Pose::new(0.0, 0.0, 1.0);
        let b = Pose::new(3.0, 4.0, -2.0);
        assert_abs_diff_eq!(a.distance_to(&b), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.distance_to(&a), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn stop_command_is_zero() {
        assert!(VelocityCommand::stop().is_stop());
        assert!(!VelocityCommand::new(0.05, 0.0).is_stop());
    }
}
