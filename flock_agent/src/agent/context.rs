// flock_agent/src/agent/context.rs

use std::time::Instant;

use flock_core::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::AgentSettings;
use crate::transport::{Outbound, Transport};

/// All mutable state of one agent.
///
/// Owned by the event loop and handed to exactly one handler at a time, so
/// nothing in here needs a lock. Handlers take the transport and the current
/// time as arguments, which also lets tests drive them directly.
#[derive(Debug)]
pub struct AgentContext {
    settings: AgentSettings,
    roster: Roster,
    neighborhood: Neighborhood,
    consensus: ConsensusHeading,
    controller: MotionController,
    mode: OperatingMode,
    current: Pose,
    pending_manual: Option<VelocityCommand>,
    watchdog: Watchdog,
    started_at: Instant,
    announced: bool,
    parse_failures: u64,
    unreported_parse_failures: u64,
    transitions_to_auto: u32,
    last_label: String,
}

impl AgentContext {
    pub fn new(settings: AgentSettings, now: Instant) -> Self {
        let roster = Roster::new(&settings.members);
        let neighborhood = Neighborhood::empty(settings.self_id);
        let controller = MotionController::new(settings.gains, settings.scale);
        let watchdog = Watchdog::new(settings.watchdog_timeout, now);
        let mut ctx = Self {
            settings,
            roster,
            neighborhood,
            consensus: ConsensusHeading::default(),
            controller,
            mode: OperatingMode::default(),
            current: Pose::zero(),
            pending_manual: None,
            watchdog,
            started_at: now,
            announced: false,
            parse_failures: 0,
            unreported_parse_failures: 0,
            transitions_to_auto: 0,
            last_label: String::new(),
        };
        ctx.recompute();
        ctx
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    pub fn consensus(&self) -> ConsensusHeading {
        self.consensus
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn current_pose(&self) -> Pose {
        self.current
    }

    pub fn motion_state(&self) -> MotionState {
        self.controller.state()
    }

    /// The label most recently published on the state machine channel.
    pub fn last_label(&self) -> &str {
        &self.last_label
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    pub fn transitions_to_auto(&self) -> u32 {
        self.transitions_to_auto
    }

    pub fn watchdog_deadline(&self) -> Instant {
        self.watchdog.deadline()
    }

    pub fn watchdog_fired(&self) -> u64 {
        self.watchdog.fired_count()
    }

    // --- Inbound handlers ---

    /// A pose broadcast arrived on the shared channel.
    ///
    /// Malformed or unknown-sender messages are dropped without touching the
    /// roster; the error is returned for the caller's benefit only.
    pub fn on_pose_broadcast(
        &mut self,
        text: &str,
        transport: &mut dyn Transport,
    ) -> Result<AgentId, ParseError> {
        let (id, pose) = match decode_pose(text, &self.settings.members) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.parse_failures += 1;
                self.unreported_parse_failures += 1;
                warn!(agent = %self.settings.name, "Dropping pose broadcast '{}': {}", text, e);
                return Err(e);
            }
        };

        self.roster.update(id, pose);
        self.recompute();

        let ConsensusHeading { global, local } = self.consensus;
        trace!(
            agent = %self.settings.name,
            from = %self.settings.members.name(id),
            neighbors = self.neighborhood.len(),
            "global heading {:.4}, local heading {:.4}",
            global,
            local
        );
        self.publish(
            transport,
            Outbound::Debug(format!("{}, {}, {}, {}", text, self.settings.name, global, local)),
        );
        self.publish(transport, Outbound::GlobalHeading(global));
        self.publish(transport, Outbound::LocalHeading(local));
        Ok(id)
    }

    /// The external mode switch changed. Any mode change stops the agent.
    pub fn on_mode(&mut self, code: u8, transport: &mut dyn Transport, now: Instant) {
        let next = OperatingMode::from_code(code, &self.settings.autonomous_codes);
        if next.is_autonomous() && !self.mode.is_autonomous() {
            self.transitions_to_auto += 1;
            if self.transitions_to_auto == 1 {
                info!(
                    agent = %self.settings.name,
                    "First transition to autonomous mode after {:.1}s",
                    now.saturating_duration_since(self.started_at).as_secs_f64()
                );
            } else {
                debug!(agent = %self.settings.name, "Autonomous mode resumed (mode {})", code);
            }
        }
        if next != self.mode {
            info!(agent = %self.settings.name, "Mode {} -> {}", self.mode.code(), code);
        }
        self.mode = next;
        self.pending_manual = None;
        self.emit_command(VelocityCommand::stop(), transport, now);
    }

    /// A manual command arrived. Only meaningful outside autonomous mode.
    pub fn on_manual(&mut self, command: VelocityCommand) {
        if self.mode.is_autonomous() {
            trace!(agent = %self.settings.name, "Ignoring manual command in autonomous mode");
            return;
        }
        self.pending_manual = Some(command);
    }

    pub fn on_odometry(&mut self, odometry: &Odometry) {
        self.current = odometry.pose();
    }

    /// Obstacle reports are accepted and logged; avoidance is not implemented.
    pub fn on_obstacle(&mut self, code: u8) {
        match code {
            0 => {}
            1 => debug!(agent = %self.settings.name, "Obstacle on the right"),
            _ => debug!(agent = %self.settings.name, "Obstacle ahead or on the left"),
        }
    }

    // --- Periodic handlers ---

    /// The control tick: run the controller, then broadcast our own pose and
    /// state.
    ///
    /// The watchdog is refreshed by the command this tick sends, not by the
    /// tick itself; a manual tick with no pending command leaves it running.
    pub fn on_control_tick(&mut self, transport: &mut dyn Transport, now: Instant) {
        // Our own slot tracks odometry directly instead of waiting for the echo.
        self.roster.update(self.settings.self_id, self.current);
        self.recompute();

        let output = self.controller.step(&ControlInput {
            mode: self.mode,
            current: self.current,
            target_heading: self.neighborhood.direction_theta(),
            manual: self.pending_manual.take(),
        });
        if let Some(command) = output.command {
            self.emit_command(command, transport, now);
        }

        self.publish(
            transport,
            Outbound::Pose(encode_pose(&self.settings.name, &self.current)),
        );
        self.publish(transport, Outbound::StateMachine(output.label.clone()));
        self.last_label = output.label;
    }

    /// The status tick: liveness, a one-time name announcement, and a report
    /// of any broadcasts dropped since the previous tick.
    pub fn on_status_tick(&mut self, transport: &mut dyn Transport) {
        if !self.announced {
            self.publish(
                transport,
                Outbound::Message(format!("I {}", self.settings.name)),
            );
            self.announced = true;
        }
        self.publish(transport, Outbound::Status("online".to_string()));

        if self.unreported_parse_failures > 0 {
            warn!(
                agent = %self.settings.name,
                "{} pose broadcasts dropped since last status ({} total)",
                self.unreported_parse_failures,
                self.parse_failures
            );
            self.unreported_parse_failures = 0;
        }
    }

    /// The watchdog timer expired. Returns whether a forced stop was sent.
    ///
    /// Also called ahead of every command, so a firing that is already due is
    /// delivered before a refresh can push the deadline past it.
    pub fn on_watchdog(&mut self, transport: &mut dyn Transport, now: Instant) -> bool {
        if !self.watchdog.poll(now) {
            return false;
        }
        info!(
            agent = %self.settings.name,
            "Movement input timeout after {:?}. Stopping at {:.4}s.",
            self.watchdog.timeout(),
            now.saturating_duration_since(self.started_at).as_secs_f64()
        );
        // `poll` has already re-armed the countdown from `now`.
        if let Err(e) = transport.publish(Outbound::Velocity(VelocityCommand::stop())) {
            warn!(agent = %self.settings.name, "Forced stop not sent: {}", e);
        }
        self.publish(
            transport,
            Outbound::WatchdogElapsed {
                fired: self.watchdog.fired_count(),
            },
        );
        true
    }

    // --- Private Helpers ---

    fn recompute(&mut self) {
        self.neighborhood = Neighborhood::compute(
            &self.roster,
            self.settings.self_id,
            self.settings.proximity_threshold,
        );
        self.consensus = ConsensusHeading::compute(&self.roster, &self.neighborhood);
    }

    /// Sends a command and, if it went out, restarts the watchdog. A forced
    /// stop that fell due first is sent ahead of it.
    fn emit_command(&mut self, command: VelocityCommand, transport: &mut dyn Transport, now: Instant) {
        self.on_watchdog(transport, now);
        match transport.publish(Outbound::Velocity(command)) {
            Ok(()) => self.watchdog.refresh(now),
            Err(e) => warn!(agent = %self.settings.name, "Velocity command not sent: {}", e),
        }
    }

    fn publish(&self, transport: &mut dyn Transport, message: Outbound) {
        if let Err(e) = transport.publish(message) {
            debug!(agent = %self.settings.name, "Publish failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlockConfig;
    use crate::transport::RecordingTransport;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::time::Duration;

    fn context(name: &str) -> (AgentContext, Instant) {
        let mut config = FlockConfig::default();
        config.agent.name = name.to_string();
        let now = Instant::now();
        (AgentContext::new(config.settings().unwrap(), now), now)
    }

    fn velocity_published(transport: &RecordingTransport) -> Option<VelocityCommand> {
        transport.velocities().last().copied()
    }

    /// Parks every member except `keep` far away from the origin and from
    /// each other.
    fn scatter(ctx: &mut AgentContext, keep: &[&str], transport: &mut RecordingTransport) {
        let names: Vec<String> = ctx.settings().members.names().map(String::from).collect();
        for (i, name) in names.iter().enumerate() {
            if keep.contains(&name.as_str()) {
                continue;
            }
            let far = 100.0 + 10.0 * i as f64;
            ctx.on_pose_broadcast(&format!("{}, {}, {}, 0", name, far, far), transport)
                .unwrap();
        }
        transport.clear();
    }

    #[test]
    fn neighbor_broadcast_sets_local_heading() {
        let (mut ctx, _) = context("ajax");
        let mut transport = RecordingTransport::default();
        scatter(&mut ctx, &["ajax", "aeneas"], &mut transport);

        ctx.on_pose_broadcast("ajax, 0, 0, 0", &mut transport).unwrap();
        let aeneas = ctx
            .on_pose_broadcast("aeneas, 1, 0, 1.5707963267948966", &mut transport)
            .unwrap();

        assert_eq!(ctx.neighborhood().members(), &[aeneas]);
        assert_abs_diff_eq!(ctx.consensus().local, FRAC_PI_2, epsilon = 1e-12);
        assert!(transport
            .published
            .contains(&Outbound::LocalHeading(ctx.consensus().local)));
    }

    #[test]
    fn malformed_broadcasts_leave_the_roster_alone() {
        let (mut ctx, _) = context("ajax");
        let mut transport = RecordingTransport::default();

        assert!(ctx.on_pose_broadcast("foo,1,2", &mut transport).is_err());
        assert!(ctx
            .on_pose_broadcast("ajax,1,notanumber,3", &mut transport)
            .is_err());
        assert!(ctx
            .on_pose_broadcast("odysseus, 5, 5, 0", &mut transport)
            .is_err());

        assert!(ctx.roster().all_poses().all(|(_, p)| p == Pose::zero()));
        assert_eq!(ctx.parse_failures(), 3);
        assert!(transport.published.is_empty());

        // A good message right after is still processed.
        assert!(ctx.on_pose_broadcast("paris, 1, 1, 0", &mut transport).is_ok());
    }

    #[test]
    fn autonomous_tick_steers_toward_neighbors() {
        let (mut ctx, now) = context("ajax");
        let mut transport = RecordingTransport::default();
        ctx.on_mode(2, &mut transport, now);
        // Only aeneas is close, straight up the y axis.
        scatter(&mut ctx, &["ajax", "aeneas"], &mut transport);
        ctx.on_pose_broadcast("aeneas, 0, 1, 0", &mut transport)
            .unwrap();
        transport.clear();

        ctx.on_control_tick(&mut transport, now + Duration::from_millis(100));

        let command = velocity_published(&transport).unwrap();
        // 0.5 * (π/2 - 0), times the actuation scale of 8.
        assert_abs_diff_eq!(command.angular, 0.5 * FRAC_PI_2 * 8.0, epsilon = 1e-9);
        assert_abs_diff_eq!(command.linear, 0.05 * 1.3, epsilon = 1e-12);
        assert_eq!(ctx.last_label(), "TRANSLATING");
        assert!(transport
            .published
            .contains(&Outbound::Pose("ajax, 0, 0, 0".to_string())));
    }

    #[test]
    fn manual_mode_passes_commands_through_and_keeps_tracking() {
        let (mut ctx, now) = context("ajax");
        let mut transport = RecordingTransport::default();
        ctx.on_mode(1, &mut transport, now);
        scatter(&mut ctx, &["ajax", "aeneas"], &mut transport);

        ctx.on_pose_broadcast("aeneas, 1, 0, 1.5707963267948966", &mut transport)
            .unwrap();
        assert_eq!(ctx.neighborhood().len(), 1);
        assert_abs_diff_eq!(ctx.consensus().local, FRAC_PI_2, epsilon = 1e-12);

        let joystick = VelocityCommand::new(0.3, -0.7);
        ctx.on_manual(joystick);
        transport.clear();
        ctx.on_control_tick(&mut transport, now);

        assert_eq!(transport.velocities(), vec![joystick]);
        assert_eq!(ctx.last_label(), "WAITING, CURRENT MODE: 1");

        // The command was consumed; the next tick has nothing to mirror.
        transport.clear();
        ctx.on_control_tick(&mut transport, now);
        assert!(transport.velocities().is_empty());
    }

    #[test]
    fn mode_change_stops_and_counts_transitions() {
        let (mut ctx, now) = context("hector");
        let mut transport = RecordingTransport::default();

        ctx.on_mode(3, &mut transport, now);
        ctx.on_mode(2, &mut transport, now);
        ctx.on_mode(0, &mut transport, now);
        ctx.on_mode(2, &mut transport, now);

        assert_eq!(transport.velocities().len(), 4);
        assert!(transport.velocities().iter().all(VelocityCommand::is_stop));
        assert_eq!(ctx.transitions_to_auto(), 2);
        assert!(ctx.mode().is_autonomous());
    }

    #[test]
    fn manual_commands_are_ignored_while_autonomous() {
        let (mut ctx, now) = context("ajax");
        let mut transport = RecordingTransport::default();
        ctx.on_mode(2, &mut transport, now);
        ctx.on_manual(VelocityCommand::new(1.0, 1.0));
        transport.clear();

        ctx.on_control_tick(&mut transport, now);
        let command = velocity_published(&transport).unwrap();
        assert_abs_diff_eq!(command.linear, 0.05 * 1.3, epsilon = 1e-12);
    }

    #[test]
    fn status_announces_once() {
        let (mut ctx, _) = context("paris");
        let mut transport = RecordingTransport::default();
        ctx.on_status_tick(&mut transport);
        ctx.on_status_tick(&mut transport);

        let announcements = transport
            .published
            .iter()
            .filter(|m| matches!(m, Outbound::Message(text) if text == "I paris"))
            .count();
        let statuses = transport
            .published
            .iter()
            .filter(|m| matches!(m, Outbound::Status(text) if text == "online"))
            .count();
        assert_eq!(announcements, 1);
        assert_eq!(statuses, 2);
    }

    #[test]
    fn watchdog_forces_a_single_stop_per_timeout() {
        let (mut ctx, start) = context("ajax");
        let mut transport = RecordingTransport::default();

        assert!(!ctx.on_watchdog(&mut transport, start + Duration::from_secs(5)));
        assert!(ctx.on_watchdog(&mut transport, start + Duration::from_secs(10)));
        assert!(!ctx.on_watchdog(&mut transport, start + Duration::from_secs(10)));

        assert_eq!(transport.velocities(), vec![VelocityCommand::stop()]);
        assert!(transport
            .published
            .contains(&Outbound::WatchdogElapsed { fired: 1 }));
        assert_eq!(ctx.watchdog_deadline(), start + Duration::from_secs(20));
    }

    #[test]
    fn overdue_stop_is_sent_before_the_next_command() {
        let (mut ctx, start) = context("ajax");
        let mut transport = RecordingTransport::default();
        ctx.on_mode(1, &mut transport, start);
        transport.clear();

        let joystick = VelocityCommand::new(0.3, 0.1);
        ctx.on_manual(joystick);
        let late = start + Duration::from_secs(12);
        ctx.on_control_tick(&mut transport, late);

        assert_eq!(transport.velocities(), vec![VelocityCommand::stop(), joystick]);
        assert_eq!(ctx.watchdog_fired(), 1);
        assert!(transport
            .published
            .contains(&Outbound::WatchdogElapsed { fired: 1 }));
        // The stop is not sent a second time when the timer branch runs.
        assert!(!ctx.on_watchdog(&mut transport, late));
        assert_eq!(ctx.watchdog_deadline(), late + Duration::from_secs(10));
    }

    #[test]
    fn odometry_sets_the_current_pose() {
        let (mut ctx, _) = context("ajax");
        let pose = Pose::new(1.5, -0.5, 0.25);
        ctx.on_odometry(&Odometry::from_pose(&pose));

        let current = ctx.current_pose();
        assert_abs_diff_eq!(current.x, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(current.y, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(current.theta, 0.25, epsilon = 1e-9);
        assert_eq!(ctx.motion_state(), MotionState::Translate);
    }

    #[test]
    fn commands_refresh_the_watchdog() {
        let (mut ctx, start) = context("ajax");
        let mut transport = RecordingTransport::default();
        ctx.on_mode(2, &mut transport, start);

        let tick = start + Duration::from_secs(9);
        ctx.on_control_tick(&mut transport, tick);
        assert_eq!(ctx.watchdog_deadline(), tick + Duration::from_secs(10));
        assert!(!ctx.on_watchdog(&mut transport, start + Duration::from_secs(10)));
    }
}
