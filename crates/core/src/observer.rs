//! Stats observers
//!
//! Other subsystems (diagnostics pages, a task manager) can subscribe to be
//! told whenever a renderer reports new cache usage.

use cachehost_cache::{RendererId, UsageStats};

/// Handle returned by [`StatsObservers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type StatsCallback = Box<dyn FnMut(RendererId, &UsageStats)>;

/// Ordered list of stats callbacks
#[derive(Default)]
pub struct StatsObservers {
    next_id: u64,
    observers: Vec<(SubscriptionId, StatsCallback)>,
}

impl StatsObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; callbacks run in subscription order
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(RendererId, &UsageStats) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Drop a callback. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, renderer_id: RendererId, stats: &UsageStats) {
        for (_, callback) in &mut self.observers {
            callback(renderer_id, stats);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for StatsObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsObservers")
            .field("observers", &self.observers.len())
            .finish()
    }
}
