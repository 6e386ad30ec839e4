// flock_core/src/control/actuation.rs

use serde::{Deserialize, Serialize};

use crate::types::VelocityCommand;

/// Parameters of the proportional heading law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerGains {
    /// Proportional gain on heading error.
    #[serde(default = "default_kp")]
    pub kp: f64,
    /// Linear speed while translating.
    #[serde(default = "default_cruise_speed")]
    pub cruise_speed: f64,
    /// Wrap the heading error into `[-π, π]` before applying the gain.
    #[serde(default)]
    pub wrap_heading_error: bool,
}

fn default_kp() -> f64 {
    0.5
}
fn default_cruise_speed() -> f64 {
    0.05
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            cruise_speed: default_cruise_speed(),
            wrap_heading_error: false,
        }
    }
}

/// Hardware/simulator calibration applied to autonomous commands on their
/// way to the actuation channel. Not part of the control law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActuationScale {
    #[serde(default = "default_linear_scale")]
    pub linear: f64,
    #[serde(default = "default_angular_scale")]
    pub angular: f64,
}

fn default_linear_scale() -> f64 {
    1.3
}
fn default_angular_scale() -> f64 {
    8.0
}

impl ActuationScale {
    /// No scaling at all.
    pub fn identity() -> Self {
        Self {
            linear: 1.0,
            angular: 1.0,
        }
    }

    pub fn apply(&self, command: VelocityCommand) -> VelocityCommand {
        VelocityCommand::new(command.linear * self.linear, command.angular * self.angular)
    }
}

impl Default for ActuationScale {
    fn default() -> Self {
        Self {
            linear: default_linear_scale(),
            angular: default_angular_scale(),
        }
    }
}
