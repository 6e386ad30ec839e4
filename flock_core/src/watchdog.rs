// flock_core/src/watchdog.rs

use std::time::{Duration, Instant};

/// A restartable safety countdown.
///
/// Every emitted velocity command calls [`refresh`](Watchdog::refresh). If the
/// deadline passes without one, [`poll`](Watchdog::poll) reports a firing
/// exactly once and re-arms for another full timeout, so a silent command
/// source produces one forced stop per elapsed period.
///
/// The watchdog holds no clock of its own; callers pass `now`. Whoever owns it
/// must serialize `refresh` and `poll`, and must `poll` before every
/// `refresh`: `refresh` moves the deadline unconditionally, so refreshing
/// past an unpolled deadline would drop a firing that was already due.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    deadline: Instant,
    fired: u64,
}

impl Watchdog {
    /// Arms the countdown starting at `now`.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            deadline: now + timeout,
            fired: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// When the watchdog will fire if nothing refreshes it.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Stop-then-start: the countdown restarts from `now`.
    pub fn refresh(&mut self, now: Instant) {
        self.deadline = now + self.timeout;
    }

    /// Returns `true` once if the deadline has passed, re-arming from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.fired += 1;
        self.deadline = now + self.timeout;
        true
    }

    /// How many times the watchdog has fired since it was created.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}
