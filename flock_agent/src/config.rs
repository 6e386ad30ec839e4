// flock_agent/src/config.rs

//! Loading and validating the agent configuration.
//!
//! Layers, lowest priority first: built-in defaults, the TOML file, then
//! `FLOCK_`-prefixed environment variables (`__` separates nesting, e.g.
//! `FLOCK_AGENT__NAME=hector`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use flock_core::membership::DEFAULT_MEMBERS;
use flock_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Used when no `--config` is given. A missing default file is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "flock.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {0:?}")]
    MissingFile(PathBuf),
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid swarm membership: {0}")]
    Membership(#[from] MembershipError),
    #[error("agent '{0}' is not a member of the swarm")]
    NotAMember(String),
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # FlockConfig
/// The root of the data parsed from `flock.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FlockConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub swarm: SwarmSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub controller: ControllerGains,
    #[serde(default)]
    pub actuation: ActuationScale,
    #[serde(default)]
    pub modes: ModeSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// This agent's name; must appear in `swarm.members`.
    pub name: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_MEMBERS[0].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmSection {
    /// Every swarm member, in roster slot order.
    #[serde(default = "default_members")]
    pub members: Vec<String>,
    /// Peers strictly closer than this (distance units) are neighbors.
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f64,
}

fn default_members() -> Vec<String> {
    DEFAULT_MEMBERS.iter().map(|n| n.to_string()).collect()
}
fn default_proximity_threshold() -> f64 {
    2.0
}

impl Default for SwarmSection {
    fn default() -> Self {
        Self {
            members: default_members(),
            proximity_threshold: default_proximity_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingSection {
    #[serde(default = "default_control_period")]
    pub control_period_secs: f64,
    #[serde(default = "default_status_period")]
    pub status_period_secs: f64,
    #[serde(default = "default_watchdog_timeout")]
    pub watchdog_timeout_secs: f64,
}

fn default_control_period() -> f64 {
    0.1
}
fn default_status_period() -> f64 {
    5.0
}
fn default_watchdog_timeout() -> f64 {
    10.0
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            control_period_secs: default_control_period(),
            status_period_secs: default_status_period(),
            watchdog_timeout_secs: default_watchdog_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeSection {
    /// Mode codes that enable autonomous control. Anything else is manual.
    #[serde(default = "default_autonomous_codes")]
    pub autonomous: Vec<u8>,
}

fn default_autonomous_codes() -> Vec<u8> {
    vec![2, 3]
}

impl Default for ModeSection {
    fn default() -> Self {
        Self {
            autonomous: default_autonomous_codes(),
        }
    }
}

/// Parameters for `flock --simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    #[serde(default = "default_sim_duration")]
    pub duration_secs: f64,
    /// Agents spawn uniformly inside a square of this half-width.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f64,
    /// Standard deviation of the noise added to simulated odometry positions.
    #[serde(default)]
    pub odometry_noise_stddev: f64,
}

fn default_sim_duration() -> f64 {
    30.0
}
fn default_spawn_radius() -> f64 {
    1.5
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            duration_secs: default_sim_duration(),
            spawn_radius: default_spawn_radius(),
            odometry_noise_stddev: 0.0,
        }
    }
}

// =========================================================================
// == Loading and Validation ==
// =========================================================================

impl FlockConfig {
    /// Loads defaults, then `path` (or [`DEFAULT_CONFIG_PATH`] when absent),
    /// then the environment. An explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::MissingFile(p.to_path_buf())),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };
        Self::figment(&file).extract().map_err(ConfigError::from)
    }

    /// The layered figment, exposed so callers can add their own providers.
    ///
    /// Only `FLOCK_<SECTION>__*` variables are read, so unrelated `FLOCK_*`
    /// variables do not trip `deny_unknown_fields`.
    pub fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(FlockConfig::default()))
            .merge(Toml::file(file))
            .merge(
                Env::prefixed("FLOCK_")
                    .filter(|key| is_section_key(key.as_str()))
                    .split("__"),
            )
    }

    /// Validates the whole configuration and resolves the settings for the
    /// agent named in `[agent]`.
    pub fn settings(&self) -> Result<AgentSettings, ConfigError> {
        self.settings_for(&self.agent.name)
    }

    /// Same as [`settings`](Self::settings) for an arbitrary member; the
    /// simulator uses it to run the whole swarm from one file.
    pub fn settings_for(&self, name: &str) -> Result<AgentSettings, ConfigError> {
        let members = Membership::new(&self.swarm.members)?;
        let self_id = members
            .resolve(name)
            .ok_or_else(|| ConfigError::NotAMember(name.to_string()))?;

        positive("swarm.proximity_threshold", self.swarm.proximity_threshold)?;
        positive("controller.kp", self.controller.kp)?;
        non_negative("controller.cruise_speed", self.controller.cruise_speed)?;
        positive("actuation.linear", self.actuation.linear)?;
        positive("actuation.angular", self.actuation.angular)?;

        Ok(AgentSettings {
            name: name.to_string(),
            self_id,
            members,
            proximity_threshold: self.swarm.proximity_threshold,
            control_period: seconds("timing.control_period_secs", self.timing.control_period_secs)?,
            status_period: seconds("timing.status_period_secs", self.timing.status_period_secs)?,
            watchdog_timeout: seconds(
                "timing.watchdog_timeout_secs",
                self.timing.watchdog_timeout_secs,
            )?,
            gains: self.controller,
            scale: self.actuation,
            autonomous_codes: self.modes.autonomous.clone(),
        })
    }
}

/// Top-level tables of [`FlockConfig`].
const SECTIONS: [&str; 7] = [
    "agent",
    "swarm",
    "timing",
    "controller",
    "actuation",
    "modes",
    "simulation",
];

/// Whether an environment key (prefix already stripped) names a field inside
/// one of the config tables.
fn is_section_key(key: &str) -> bool {
    key.split_once("__").map_or(false, |(section, _)| {
        SECTIONS.iter().any(|s| section.eq_ignore_ascii_case(s))
    })
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    positive(field, value).map(Duration::from_secs_f64)
}

/// Validated, typed parameters for one agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub name: String,
    pub self_id: AgentId,
    pub members: Membership,
    pub proximity_threshold: f64,
    pub control_period: Duration,
    pub status_period: Duration,
    pub watchdog_timeout: Duration,
    pub gains: ControllerGains,
    pub scale: ActuationScale,
    pub autonomous_codes: Vec<u8>,
}
