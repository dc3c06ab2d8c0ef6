//! Renderer registry
//!
//! Tracks which renderers exist, whether each one is active or inactive, and
//! the last usage stats each one reported.
//!
//! Every known renderer is in exactly one of the two activity sets, and the
//! two sets together hold exactly the renderers that have a stats entry.

use cachehost_cache::{RendererGroup, RendererId, UsageStats};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Default idle time after which an active renderer becomes inactive (5 minutes)
pub const DEFAULT_INACTIVE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Activity state of a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Used within the inactivity threshold
    Active,
    /// Idle past the inactivity threshold
    Inactive,
}

/// What the registry knows about one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererInfo {
    /// Latest reported usage
    pub stats: UsageStats,
    /// Last time the renderer was added or seen active
    pub access: Instant,
}

/// Registry of renderers and their activity
#[derive(Debug, Default)]
pub struct RendererRegistry {
    active: BTreeSet<RendererId>,
    inactive: BTreeSet<RendererId>,
    renderers: BTreeMap<RendererId, RendererInfo>,
}

impl RendererRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer as active with zeroed stats
    ///
    /// Adding a renderer that is already active is tolerated (a renderer can
    /// be recreated while its tab is being set up) and resets its stats.
    pub fn add(&mut self, renderer_id: RendererId, now: Instant) {
        if self.inactive.remove(&renderer_id) {
            tracing::warn!(renderer_id, "added renderer was already registered as inactive");
        }

        self.active.insert(renderer_id);
        self.renderers.insert(
            renderer_id,
            RendererInfo {
                stats: UsageStats::default(),
                access: now,
            },
        );
    }

    /// Forget a renderer
    ///
    /// Returns `false` (and logs) if the renderer was not registered.
    pub fn remove(&mut self, renderer_id: RendererId) -> bool {
        let was_active = self.active.remove(&renderer_id);
        let was_inactive = self.inactive.remove(&renderer_id);
        self.renderers.remove(&renderer_id);

        if !was_active && !was_inactive {
            tracing::warn!(renderer_id, "removed renderer that was never registered");
            return false;
        }
        true
    }

    /// Record that a renderer was just used
    ///
    /// Returns `true` if the renderer was inactive and has been moved back to
    /// the active set, which warrants a new allocation.
    pub fn observe_activity(&mut self, renderer_id: RendererId, now: Instant) -> bool {
        if let Some(info) = self.renderers.get_mut(&renderer_id) {
            info.access = now;
        } else {
            // Activity for a renderer that was never added (or already
            // removed) must not break the partition.
            tracing::debug!(renderer_id, "activity for unknown renderer ignored");
            return false;
        }

        self.active.insert(renderer_id);
        self.inactive.remove(&renderer_id)
    }

    /// Store the latest usage reported by a renderer
    ///
    /// Returns the stored stats, or `None` if the renderer is unknown (it may
    /// have been torn down while the report was in flight).
    pub fn observe_stats(
        &mut self,
        renderer_id: RendererId,
        stats: UsageStats,
    ) -> Option<UsageStats> {
        let info = self.renderers.get_mut(&renderer_id)?;
        info.stats = stats;
        Some(info.stats)
    }

    /// Move every active renderer idle for at least `threshold` to the
    /// inactive set
    ///
    /// Returns the renderers that were moved.
    pub fn find_inactive(&mut self, now: Instant, threshold: Duration) -> Vec<RendererId> {
        let idle: Vec<RendererId> = self
            .active
            .iter()
            .copied()
            .filter(|id| {
                self.renderers
                    .get(id)
                    .is_some_and(|info| now.saturating_duration_since(info.access) >= threshold)
            })
            .collect();

        for id in &idle {
            self.active.remove(id);
            self.inactive.insert(*id);
        }

        if !idle.is_empty() {
            tracing::debug!(renderers = ?idle, "renderers went inactive");
        }
        idle
    }

    /// Renderers in one activity state, with their stats, in id order
    pub fn group(&self, activity: Activity) -> RendererGroup {
        self.ids(activity)
            .iter()
            .map(|id| (*id, self.renderers.get(id).map(|info| info.stats)))
            .collect()
    }

    /// Usage summed over every renderer in one activity state
    pub fn usage(&self, activity: Activity) -> UsageStats {
        self.ids(activity)
            .iter()
            .filter_map(|id| self.renderers.get(id))
            .map(|info| info.stats)
            .sum()
    }

    /// Activity state of a renderer, if it is registered
    pub fn activity(&self, renderer_id: RendererId) -> Option<Activity> {
        if self.active.contains(&renderer_id) {
            Some(Activity::Active)
        } else if self.inactive.contains(&renderer_id) {
            Some(Activity::Inactive)
        } else {
            None
        }
    }

    /// Everything known about a renderer
    pub fn info(&self, renderer_id: RendererId) -> Option<&RendererInfo> {
        self.renderers.get(&renderer_id)
    }

    pub fn contains(&self, renderer_id: RendererId) -> bool {
        self.renderers.contains_key(&renderer_id)
    }

    pub fn active_ids(&self) -> impl Iterator<Item = RendererId> + '_ {
        self.active.iter().copied()
    }

    pub fn inactive_ids(&self) -> impl Iterator<Item = RendererId> + '_ {
        self.inactive.iter().copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn inactive_count(&self) -> usize {
        self.inactive.len()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Check that the activity sets partition the registered renderers
    pub fn is_consistent(&self) -> bool {
        self.active.is_disjoint(&self.inactive)
            && self.active.len() + self.inactive.len() == self.renderers.len()
            && self
                .active
                .iter()
                .chain(self.inactive.iter())
                .all(|id| self.renderers.contains_key(id))
    }

    fn ids(&self, activity: Activity) -> &BTreeSet<RendererId> {
        match activity {
            Activity::Active => &self.active,
            Activity::Inactive => &self.inactive,
        }
    }
}
