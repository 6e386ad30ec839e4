// flock_agent/src/sim/mod.rs

//! Runs a whole swarm in one process.
//!
//! Each member gets a real agent event loop wired to a shared [`SwarmBus`],
//! plus a plant task that plays the part of the rover: it reads the agent's
//! velocity commands, integrates a [`Unicycle`], and feeds odometry back.

mod kinematics;

pub use kinematics::Unicycle;

use std::time::Duration;

use flock_core::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::agent::{spawn_agent, AgentContext, AgentHandle, AgentInputs};
use crate::config::{AgentSettings, ConfigError, FlockConfig};
use crate::transport::{LoopbackTransport, Outbound, SwarmBus};

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no autonomous mode code configured")]
    NoAutonomousMode,
    #[error("odometry noise stddev must be finite and non-negative, got {0}")]
    Noise(f64),
    #[error("spawn radius must be finite and non-negative, got {0}")]
    SpawnRadius(f64),
    #[error("simulation task failed: {0}")]
    Join(#[from] JoinError),
}

/// Final state of one simulated member.
#[derive(Debug, Clone)]
pub struct AgentReport {
    pub name: String,
    /// Ground-truth pose from the plant.
    pub pose: Pose,
    pub global_heading: f64,
    pub local_heading: f64,
    pub neighbors: usize,
    pub watchdog_fired: u64,
    pub parse_failures: u64,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub elapsed: Duration,
    pub agents: Vec<AgentReport>,
}

impl SimulationReport {
    /// Mean distance of the members from their centroid.
    pub fn spread(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let n = self.agents.len() as f64;
        let centroid = self
            .agents
            .iter()
            .fold(nalgebra::Vector2::<f64>::zeros(), |acc, a| acc + a.pose.position())
            / n;
        self.agents
            .iter()
            .map(|a| (a.pose.position() - centroid).norm())
            .sum::<f64>()
            / n
    }

    /// Length of the mean heading vector, from 0 (no agreement) to 1 (all
    /// members pointing the same way).
    pub fn alignment(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let (s, c) = self
            .agents
            .iter()
            .fold((0.0, 0.0), |(s, c), a| (s + a.pose.theta.sin(), c + a.pose.theta.cos()));
        s.hypot(c) / self.agents.len() as f64
    }
}

/// One member's plumbing while the simulation runs.
struct Member {
    name: String,
    agent: AgentHandle,
    plant: JoinHandle<Pose>,
    forwarder: JoinHandle<()>,
}

pub struct SwarmSimulation {
    config: FlockConfig,
    settings: Vec<AgentSettings>,
    mode_code: u8,
    noise: Normal<f64>,
}

impl SwarmSimulation {
    /// Validates the configuration for every member up front.
    pub fn new(config: FlockConfig) -> Result<Self, SimError> {
        let settings = config
            .swarm
            .members
            .iter()
            .map(|name| config.settings_for(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mode_code = *config
            .modes
            .autonomous
            .first()
            .ok_or(SimError::NoAutonomousMode)?;

        let stddev = config.simulation.odometry_noise_stddev;
        if !stddev.is_finite() || stddev < 0.0 {
            return Err(SimError::Noise(stddev));
        }
        let noise = Normal::new(0.0, stddev).map_err(|_| SimError::Noise(stddev))?;
        let radius = config.simulation.spawn_radius;
        if !radius.is_finite() || radius < 0.0 {
            return Err(SimError::SpawnRadius(radius));
        }

        Ok(Self {
            config,
            settings,
            mode_code,
            noise,
        })
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.config.simulation.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Runs every member for `duration` of (tokio) time, then shuts them down
    /// and collects their final state.
    pub async fn run(self, duration: Duration) -> Result<SimulationReport, SimError> {
        let mut rng = self.rng();
        let bus = SwarmBus::new(BUS_CAPACITY);
        let radius = self.config.simulation.spawn_radius;
        let started = time::Instant::now();

        let mut members = Vec::with_capacity(self.settings.len());
        for settings in &self.settings {
            let spawn = if radius > 0.0 {
                Pose::new(
                    rng.gen_range(-radius..=radius),
                    rng.gen_range(-radius..=radius),
                    rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
                )
            } else {
                Pose::zero()
            };
            debug!(
                agent = %settings.name,
                "Spawning at ({:.3}, {:.3}) facing {:.3}",
                spawn.x, spawn.y, spawn.theta
            );

            let ctx = AgentContext::new(settings.clone(), started.into_std());
            let (transport, outbox) = LoopbackTransport::new(Some(bus.clone()));
            let agent = spawn_agent(ctx, transport);
            let forwarder = tokio::spawn(forward_broadcasts(
                settings.name.clone(),
                bus.subscribe(),
                agent.inputs.clone(),
            ));
            let plant = tokio::spawn(run_plant(
                Plant {
                    pose: spawn,
                    scale: settings.scale,
                    period: settings.control_period,
                    noise: self.noise,
                    rng: ChaCha8Rng::seed_from_u64(rng.gen()),
                },
                outbox,
                agent.inputs.clone(),
            ));
            members.push(Member {
                name: settings.name.clone(),
                agent,
                plant,
                forwarder,
            });
        }

        for member in &members {
            if member.agent.inputs.modes.send(self.mode_code).await.is_err() {
                warn!(agent = %member.name, "Agent stopped before receiving its mode");
            }
        }
        info!(
            "Swarm of {} running in mode {} for {:?}",
            members.len(),
            self.mode_code,
            duration
        );
        time::sleep(duration).await;

        let mut agents = Vec::with_capacity(members.len());
        for member in members {
            member.forwarder.abort();
            let ctx = member.agent.shutdown().await?;
            // The plant stops once the agent's transport is dropped.
            let pose = member.plant.await?;
            let consensus = ctx.consensus();
            agents.push(AgentReport {
                name: member.name,
                pose,
                global_heading: consensus.global,
                local_heading: consensus.local,
                neighbors: ctx.neighborhood().len(),
                watchdog_fired: ctx.watchdog_fired(),
                parse_failures: ctx.parse_failures(),
            });
        }

        Ok(SimulationReport {
            elapsed: started.elapsed(),
            agents,
        })
    }
}

/// Copies everything on the shared channel into one agent's pose queue.
async fn forward_broadcasts(
    agent: String,
    mut bus: broadcast::Receiver<String>,
    inputs: AgentInputs,
) {
    loop {
        match bus.recv().await {
            Ok(text) => {
                if inputs.poses.send(text).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(agent = %agent, "Fell behind on the swarm bus; {} broadcasts lost", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

struct Plant {
    pose: Pose,
    scale: ActuationScale,
    period: Duration,
    noise: Normal<f64>,
    rng: ChaCha8Rng,
}

impl Plant {
    /// Undoes the calibration the agent applied on the way out.
    fn physical(&self, command: VelocityCommand) -> VelocityCommand {
        VelocityCommand::new(
            command.linear / self.scale.linear,
            command.angular / self.scale.angular,
        )
    }

    fn odometry(&mut self) -> Odometry {
        let measured = Pose::new(
            self.pose.x + self.noise.sample(&mut self.rng),
            self.pose.y + self.noise.sample(&mut self.rng),
            self.pose.theta,
        );
        Odometry::from_pose(&measured)
    }
}

/// Integrates the agent's latest command every control period until the
/// agent goes away. Returns the true final pose.
async fn run_plant(
    mut plant: Plant,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
    inputs: AgentInputs,
) -> Pose {
    let model = Unicycle;
    let dt = plant.period.as_secs_f64();
    let mut command = VelocityCommand::stop();
    let mut tick = time::interval(plant.period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            message = outbox.recv() => match message {
                Some(Outbound::Velocity(cmd)) => command = plant.physical(cmd),
                Some(_) => {}
                None => break,
            },
            _ = tick.tick() => {
                plant.pose = model.step(&plant.pose, &command, dt);
                // Odometry is latest-wins; a full queue just skips a sample.
                if let Err(mpsc::error::TrySendError::Closed(_)) =
                    inputs.odometry.try_send(plant.odometry())
                {
                    break;
                }
            }
        }
    }
    plant.pose
}
