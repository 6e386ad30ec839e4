// flock_agent/src/agent/event_loop.rs

use flock_core::prelude::{Odometry, VelocityCommand};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::AgentContext;
use crate::transport::Transport;

// Queue depths of the rover node's subscriptions.
const POSE_QUEUE: usize = 10;
const MODE_QUEUE: usize = 1;
const MANUAL_QUEUE: usize = 10;
const ODOMETRY_QUEUE: usize = 10;
const OBSTACLE_QUEUE: usize = 10;

/// Sending halves of an agent's inbound queues, one per message class.
#[derive(Debug, Clone)]
pub struct AgentInputs {
    pub poses: mpsc::Sender<String>,
    pub modes: mpsc::Sender<u8>,
    pub manual: mpsc::Sender<VelocityCommand>,
    pub odometry: mpsc::Sender<Odometry>,
    pub obstacles: mpsc::Sender<u8>,
}

/// Receiving halves, consumed by [`run_agent`].
#[derive(Debug)]
pub struct Inbox {
    pub poses: mpsc::Receiver<String>,
    pub modes: mpsc::Receiver<u8>,
    pub manual: mpsc::Receiver<VelocityCommand>,
    pub odometry: mpsc::Receiver<Odometry>,
    pub obstacles: mpsc::Receiver<u8>,
}

pub fn inbox() -> (AgentInputs, Inbox) {
    let (poses_tx, poses_rx) = mpsc::channel(POSE_QUEUE);
    let (modes_tx, modes_rx) = mpsc::channel(MODE_QUEUE);
    let (manual_tx, manual_rx) = mpsc::channel(MANUAL_QUEUE);
    let (odometry_tx, odometry_rx) = mpsc::channel(ODOMETRY_QUEUE);
    let (obstacles_tx, obstacles_rx) = mpsc::channel(OBSTACLE_QUEUE);
    (
        AgentInputs {
            poses: poses_tx,
            modes: modes_tx,
            manual: manual_tx,
            odometry: odometry_tx,
            obstacles: obstacles_tx,
        },
        Inbox {
            poses: poses_rx,
            modes: modes_rx,
            manual: manual_rx,
            odometry: odometry_rx,
            obstacles: obstacles_rx,
        },
    )
}

/// Runs one agent until `shutdown` flips to `true` or its sender is dropped.
///
/// Every inbound message and timer expiry is handled to completion before
/// the next one is looked at, so the context is only ever touched by one
/// handler at a time. The watchdog sleep is re-armed from the context's
/// deadline after every event; it can be pushed back but never left unarmed.
///
/// Returns the context so callers can inspect the final state.
pub async fn run_agent<T: Transport>(
    mut ctx: AgentContext,
    mut inbox: Inbox,
    mut transport: T,
    mut shutdown: watch::Receiver<bool>,
) -> AgentContext {
    let settings = ctx.settings().clone();
    info!(
        agent = %settings.name,
        "Agent started: {} swarm members, control every {:?}, watchdog {:?}",
        settings.members.len(),
        settings.control_period,
        settings.watchdog_timeout
    );

    let mut control = time::interval(settings.control_period);
    control.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut status = time::interval(settings.status_period);
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let watchdog = time::sleep_until(Instant::from_std(ctx.watchdog_deadline()));
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            // Polled in order: a due watchdog runs before a tick that lands on
            // the same instant.
            biased;

            _ = &mut watchdog => {
                ctx.on_watchdog(&mut transport, now());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(text) = inbox.poses.recv() => {
                // Failures are logged and counted inside the handler.
                let _ = ctx.on_pose_broadcast(&text, &mut transport);
            }
            Some(code) = inbox.modes.recv() => {
                ctx.on_mode(code, &mut transport, now());
            }
            Some(command) = inbox.manual.recv() => {
                ctx.on_manual(command);
            }
            Some(odometry) = inbox.odometry.recv() => {
                ctx.on_odometry(&odometry);
            }
            Some(code) = inbox.obstacles.recv() => {
                ctx.on_obstacle(code);
            }
            _ = control.tick() => {
                ctx.on_control_tick(&mut transport, now());
            }
            _ = status.tick() => {
                ctx.on_status_tick(&mut transport);
            }
        }
        watchdog
            .as_mut()
            .reset(Instant::from_std(ctx.watchdog_deadline()));
    }

    debug!(agent = %settings.name, "Agent loop stopped; timers dropped");
    ctx
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

/// A running agent task and the means to reach it.
#[derive(Debug)]
pub struct AgentHandle {
    pub inputs: AgentInputs,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<AgentContext>,
}

impl AgentHandle {
    /// Signals the loop to stop and waits for its final state.
    pub async fn shutdown(self) -> Result<AgentContext, tokio::task::JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }
}

/// Builds the queues and spawns [`run_agent`] on the current runtime.
pub fn spawn_agent<T>(ctx: AgentContext, transport: T) -> AgentHandle
where
    T: Transport + 'static,
{
    let (inputs, inbox) = inbox();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_agent(ctx, inbox, transport, shutdown_rx));
    AgentHandle {
        inputs,
        shutdown,
        task,
    }
}
