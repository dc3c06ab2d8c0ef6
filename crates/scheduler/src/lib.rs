//! Cache Host Scheduler Library
//!
//! Time and deferred-work primitives for the cache allocation host.
//!
//! The host runs on a single event-loop thread. Rather than spawning timers it
//! keeps a [`DebounceTimer`] and lets its owner poll it; time is read through
//! the [`Clock`] trait so tests can drive it with a [`ManualClock`].
//!
//! # Example
//!
//! ```
//! use cachehost_scheduler::{Clock, DebounceTimer, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let mut timer = DebounceTimer::new(Duration::from_millis(200));
//!
//! timer.schedule(clock.now());
//! clock.advance(Duration::from_millis(200));
//!
//! if timer.fire_if_due(clock.now()) {
//!     // ... run the deferred work ...
//! }
//! ```

mod clock;
mod debounce;

// Re-export public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{DebounceStats, DebounceTimer, DEFAULT_DEBOUNCE_DELAY};
