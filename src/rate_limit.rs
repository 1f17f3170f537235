use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Failed logins allowed per username inside one window.
pub const MAX_FAILURES: u32 = 5;
pub const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Failed logins for one username since the window opened.
#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    failures: u32,
    opened_at: Instant,
}

impl FailureWindow {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.opened_at) > WINDOW
    }

    fn lockout(&self, now: Instant) -> Option<Lockout> {
        if self.expired(now) || self.failures < MAX_FAILURES {
            return None;
        }
        Some(Lockout {
            retry_after: WINDOW.saturating_sub(now.duration_since(self.opened_at)),
        })
    }
}

/// The username may not attempt a login again until `retry_after` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lockout {
    pub retry_after: Duration,
}

impl Lockout {
    /// Whole minutes, rounded up, for user-facing messages.
    pub fn minutes(&self) -> u64 {
        self.retry_after.as_secs().div_ceil(60).max(1)
    }
}

/// Per-username login throttle. A successful login does not close the window;
/// it only ends when it expires.
#[derive(Default)]
pub struct LoginRateLimiter {
    windows: DashMap<String, FailureWindow>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, username: &str) -> Result<(), Lockout> {
        self.check_at(username, Instant::now())
    }

    pub fn check_at(&self, username: &str, now: Instant) -> Result<(), Lockout> {
        match self.windows.get(username).and_then(|w| w.lockout(now)) {
            Some(lockout) => Err(lockout),
            None => Ok(()),
        }
    }

    /// Count a rejected login. Returns how many attempts remain before lockout.
    pub fn record_failure(&self, username: &str) -> u32 {
        self.record_failure_at(username, Instant::now())
    }

    pub fn record_failure_at(&self, username: &str, now: Instant) -> u32 {
        let mut window = self
            .windows
            .entry(username.to_string())
            .or_insert(FailureWindow {
                failures: 0,
                opened_at: now,
            });

        if window.expired(now) {
            *window = FailureWindow {
                failures: 1,
                opened_at: now,
            };
        } else {
            window.failures = window.failures.saturating_add(1);
        }
        MAX_FAILURES.saturating_sub(window.failures)
    }

    /// Drop windows that have expired.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    pub fn cleanup_at(&self, now: Instant) {
        self.windows.retain(|_, window| !window.expired(now));
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}
