// flock_agent/src/sim/kinematics.rs

use flock_core::angles::normalize_angle;
use flock_core::prelude::{Pose, VelocityCommand};

/// Planar unicycle: the body moves along its heading and turns in place.
/// State: [x, y, theta]. Control: [v, omega] in physical units.
/// x_dot = [v*cos(theta), v*sin(theta), omega]
#[derive(Debug, Clone, Copy, Default)]
pub struct Unicycle;

impl Unicycle {
    pub fn derivatives(&self, pose: &Pose, command: &VelocityCommand) -> (f64, f64, f64) {
        let (sin, cos) = pose.theta.sin_cos();
        (command.linear * cos, command.linear * sin, command.angular)
    }

    /// One explicit Euler step of length `dt` seconds.
    pub fn step(&self, pose: &Pose, command: &VelocityCommand, dt: f64) -> Pose {
        let (x_dot, y_dot, theta_dot) = self.derivatives(pose, command);
        Pose::new(
            pose.x + x_dot * dt,
            pose.y + y_dot * dt,
            normalize_angle(pose.theta + theta_dot * dt),
        )
    }
}
