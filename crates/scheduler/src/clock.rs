//! Time sources
//!
//! Everything in the host that depends on "now" reads it through [`Clock`] so
//! that inactivity thresholds and debounce delays can be driven by hand in
//! tests and simulations.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the code under test.
///
/// # Example
///
/// ```
/// use cachehost_scheduler::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
///
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now() - start, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock frozen at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::from_millis(250));

        assert_eq!(clock.now() - start, Duration::from_millis(250));
        assert_eq!(handle.now(), clock.now());
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
