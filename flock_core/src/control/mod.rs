// flock_core/src/control/mod.rs

//! The motion controller state machine.
//!
//! Motion states form a closed enum and every dispatch over them is an
//! exhaustive `match`, so a new state cannot silently fall through to a
//! default branch.

use crate::angles::normalize_angle;
use crate::types::{Pose, VelocityCommand};

mod actuation;
mod mode;

pub use actuation::{ActuationScale, ControllerGains};
pub use mode::OperatingMode;

/// States of the motion controller. `Translate` is the only one implemented;
/// `Idle`, `Seek` and `Avoid` slot in here when they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    /// Steer along the neighborhood bearing at cruise speed.
    #[default]
    Translate,
}

impl MotionState {
    /// Name published on the state machine telemetry channel.
    pub fn label(&self) -> &'static str {
        match self {
            MotionState::Translate => "TRANSLATING",
        }
    }
}

/// Everything the controller looks at on one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInput {
    pub mode: OperatingMode,
    /// The agent's own pose.
    pub current: Pose,
    /// The heading to steer toward (the neighborhood bearing).
    pub target_heading: f64,
    /// A manual command waiting to be passed through, if any.
    pub manual: Option<VelocityCommand>,
}

/// Result of one control tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlOutput {
    /// Command for the actuation channel. `None` when nothing should be sent.
    pub command: Option<VelocityCommand>,
    /// Human-readable state for telemetry.
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct MotionController {
    state: MotionState,
    gains: ControllerGains,
    scale: ActuationScale,
}

impl MotionController {
    pub fn new(gains: ControllerGains, scale: ActuationScale) -> Self {
        Self {
            state: MotionState::default(),
            gains,
            scale,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn gains(&self) -> &ControllerGains {
        &self.gains
    }

    pub fn scale(&self) -> &ActuationScale {
        &self.scale
    }

    /// The unscaled `Translate` law: `angular = kp * (target - current)` at
    /// cruise speed.
    pub fn law(&self, current_heading: f64, target_heading: f64) -> VelocityCommand {
        let mut error = target_heading - current_heading;
        if self.gains.wrap_heading_error {
            error = normalize_angle(error);
        }
        VelocityCommand::new(self.gains.cruise_speed, self.gains.kp * error)
    }

    /// Runs one control tick.
    ///
    /// Autonomous mode runs the current state's law and scales the result for
    /// actuation. Manual mode mirrors the pending manual command untouched and
    /// computes nothing.
    pub fn step(&mut self, input: &ControlInput) -> ControlOutput {
        match input.mode {
            OperatingMode::Autonomous(_) => {
                let (command, next) = match self.state {
                    MotionState::Translate => (
                        self.law(input.current.theta, input.target_heading),
                        MotionState::Translate,
                    ),
                };
                let label = self.state.label().to_string();
                self.state = next;
                ControlOutput {
                    command: Some(self.scale.apply(command)),
                    label,
                }
            }
            OperatingMode::Manual(code) => ControlOutput {
                command: input.manual,
                label: format!("WAITING, CURRENT MODE: {}", code),
            },
        }
    }
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(ControllerGains::default(), ActuationScale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn autonomous_input(theta: f64, target: f64) -> ControlInput {
        ControlInput {
            mode: OperatingMode::Autonomous(2),
            current: Pose::new(0.0, 0.0, theta),
            target_heading: target,
            manual: None,
        }
    }

    #[test]
    fn translate_law_is_proportional_on_heading_error() {
        let controller = MotionController::default();
        let command = controller.law(0.0, FRAC_PI_2);
        assert_abs_diff_eq!(command.angular, 0.5 * FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(command.angular, 0.785, epsilon = 1e-3);
        assert_abs_diff_eq!(command.linear, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn autonomous_step_scales_for_actuation() {
        let mut controller = MotionController::default();
        let out = controller.step(&autonomous_input(0.0, FRAC_PI_2));
        let command = out.command.unwrap();
        assert_abs_diff_eq!(command.linear, 0.05 * 1.3, epsilon = 1e-12);
        assert_abs_diff_eq!(command.angular, 0.5 * FRAC_PI_2 * 8.0, epsilon = 1e-12);
        assert_eq!(out.label, "TRANSLATING");
        assert_eq!(controller.state(), MotionState::Translate);
    }

    #[test]
    fn unscaled_controller_emits_the_raw_law() {
        let mut controller = MotionController::new(
            ControllerGains {
                kp: 0.5,
                cruise_speed: 0.2,
                wrap_heading_error: false,
            },
            ActuationScale::identity(),
        );
        let command = controller
            .step(&autonomous_input(0.0, FRAC_PI_2))
            .command
            .unwrap();
        assert_abs_diff_eq!(command.angular, 0.785, epsilon = 1e-3);
        assert_abs_diff_eq!(command.linear, 0.2, epsilon = 1e-12);
        assert_eq!(controller.gains().cruise_speed, 0.2);
        assert_eq!(*controller.scale(), ActuationScale::identity());
    }

    #[test]
    fn manual_mode_mirrors_command_unmodified() {
        let mut controller = MotionController::default();
        let joystick = VelocityCommand::new(0.4, -0.3);
        let out = controller.step(&ControlInput {
            mode: OperatingMode::Manual(1),
            current: Pose::new(0.0, 0.0, 0.0),
            target_heading: FRAC_PI_2,
            manual: Some(joystick),
        });
        assert_eq!(out.command, Some(joystick));
        assert_eq!(out.label, "WAITING, CURRENT MODE: 1");
    }

    #[test]
    fn manual_mode_without_command_emits_nothing() {
        let mut controller = MotionController::default();
        let out = controller.step(&ControlInput {
            mode: OperatingMode::Manual(0),
            current: Pose::zero(),
            target_heading: 1.0,
            manual: None,
        });
        assert_eq!(out.command, None);
    }

    #[test]
    fn wrapping_takes_the_short_way_round() {
        let raw = MotionController::default();
        let wrapped = MotionController::new(
            ControllerGains {
                wrap_heading_error: true,
                ..ControllerGains::default()
            },
            ActuationScale::default(),
        );
        // From just below +π to just above -π is a small left turn.
        let current = PI - 0.1;
        let target = -PI + 0.1;
        assert!(raw.law(current, target).angular < -3.0);
        assert_abs_diff_eq!(wrapped.law(current, target).angular, 0.1, epsilon = 1e-9);
    }
}
