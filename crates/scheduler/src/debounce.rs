//! Single-shot debounce timer
//!
//! Bursts of requests collapse into one deferred run: the first request arms a
//! deadline, later requests made while it is armed are absorbed, and the
//! timer disarms itself when the deadline is consumed.

use std::time::{Duration, Instant};

/// Default delay between the first request of a burst and the run (200ms)
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(200);

/// Debounce timer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Total schedule requests
    pub requests: u64,

    /// Requests absorbed by an already pending run
    pub coalesced: u64,

    /// Runs that became due and were consumed
    pub fired: u64,
}

/// Single-shot timer with a pending flag
///
/// The timer does not run anything itself. The owner asks it whether the
/// deadline has passed (typically from its event loop) and runs the deferred
/// work when [`fire_if_due`](Self::fire_if_due) returns `true`.
///
/// # Example
///
/// ```
/// use cachehost_scheduler::DebounceTimer;
/// use std::time::{Duration, Instant};
///
/// let mut timer = DebounceTimer::new(Duration::from_millis(200));
/// let start = Instant::now();
///
/// assert!(timer.schedule(start));
/// assert!(!timer.schedule(start + Duration::from_millis(50))); // coalesced
///
/// assert!(!timer.fire_if_due(start + Duration::from_millis(100)));
/// assert!(timer.fire_if_due(start + Duration::from_millis(200)));
/// assert!(!timer.is_pending());
/// ```
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
    stats: DebounceStats,
}

impl DebounceTimer {
    /// Create an idle timer with the given delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            stats: DebounceStats::default(),
        }
    }

    /// Arm the timer unless it is already pending
    ///
    /// Returns `true` if this call armed the timer, `false` if the request was
    /// absorbed by the pending run.
    pub fn schedule(&mut self, now: Instant) -> bool {
        self.stats.requests += 1;

        if self.deadline.is_some() {
            self.stats.coalesced += 1;
            return false;
        }

        self.deadline = Some(now + self.delay);
        tracing::trace!(delay_ms = self.delay.as_millis() as u64, "debounce timer armed");
        true
    }

    /// Consume the pending run if its deadline has passed
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.stats.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// Disarm the timer without running
    ///
    /// Returns `true` if a run was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Check if a run is pending
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending run becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending run is due
    ///
    /// Returns `None` if nothing is pending and `Duration::ZERO` if the run is
    /// already overdue.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Get the configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Get timer statistics
    pub fn stats(&self) -> DebounceStats {
        self.stats
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_DELAY)
    }
}
