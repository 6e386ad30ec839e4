// flock_core/src/messages.rs

use nalgebra::{UnitQuaternion, Vector3};

use crate::types::Pose;

/// Odometry from the agent's own state estimator.
#[derive(Clone, Debug, PartialEq)]
pub struct Odometry {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Odometry {
    /// Builds odometry for a planar pose (yaw-only orientation).
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position: Vector3::new(pose.x, pose.y, 0.0),
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, pose.theta),
        }
    }

    /// Projects onto the ground plane. Heading is the yaw of the orientation.
    pub fn pose(&self) -> Pose {
        let (_roll, _pitch, yaw) = self.orientation.euler_angles();
        Pose::new(self.position.x, self.position.y, yaw)
    }
}
