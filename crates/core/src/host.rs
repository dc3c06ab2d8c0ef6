//! Cache manager host
//!
//! [`CacheManagerHost`] owns the renderer registry and turns registry changes
//! into capacity updates. Changes only schedule work; the embedder's event
//! loop calls [`poll`](CacheManagerHost::poll), and once the debounce delay
//! has passed a single recompute runs for the whole burst of changes:
//!
//! 1. renderers idle past the threshold move to the inactive set,
//! 2. usage is gathered for the active and inactive groups,
//! 3. the strategist picks the first tactic pair that fits the global limit,
//! 4. each live renderer is sent its new capacity.

use cachehost_cache::{compute_strategy, AllocationStrategy, RendererId, UsageStats};
use cachehost_scheduler::{Clock, DebounceStats, DebounceTimer, SystemClock};
use std::time::{Duration, Instant};

use crate::config::HostConfig;
use crate::enactor::{EnactReport, RendererProcessTable, StrategyEnactor};
use crate::observer::{StatsObservers, SubscriptionId};
use crate::registry::{Activity, RendererRegistry};

/// Usage summed per activity group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub active: UsageStats,
    pub inactive: UsageStats,
    pub active_renderers: usize,
    pub inactive_renderers: usize,
}

/// Host-side allocator of renderer object cache capacity
///
/// One instance is created at startup and handed by reference to whatever
/// receives renderer lifecycle events. All methods run on one thread.
///
/// # Example
///
/// ```
/// use cachehost_core::{CacheManagerHost, HostConfig, RendererChannel, RendererProcessTable};
/// use cachehost_scheduler::ManualClock;
/// use std::time::Duration;
///
/// struct NoProcesses;
/// impl RendererProcessTable for NoProcesses {
///     fn lookup(&self, _: u32) -> Option<&dyn RendererChannel> {
///         None
///     }
/// }
///
/// let clock = ManualClock::new();
/// let mut host = CacheManagerHost::with_clock(HostConfig::with_limit(8 << 20), clock.clone());
///
/// host.add(1);
/// host.add(2);
/// assert!(host.is_recompute_pending());
///
/// clock.advance(Duration::from_millis(200));
/// host.poll(&NoProcesses);
///
/// let strategy = host.last_strategy().unwrap();
/// assert_eq!(strategy.capacity_for(1), Some(4 << 20));
/// ```
#[derive(Debug)]
pub struct CacheManagerHost<C: Clock = SystemClock> {
    config: HostConfig,
    registry: RendererRegistry,
    timer: DebounceTimer,
    observers: StatsObservers,
    enactor: StrategyEnactor,
    clock: C,
    last_strategy: Option<AllocationStrategy>,
}

impl CacheManagerHost<SystemClock> {
    /// Create a host driven by the system clock
    pub fn new(config: HostConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CacheManagerHost<C> {
    /// Create a host driven by `clock`
    pub fn with_clock(config: HostConfig, clock: C) -> Self {
        let timer = DebounceTimer::new(config.recompute_delay);
        Self {
            config,
            registry: RendererRegistry::new(),
            timer,
            observers: StatsObservers::new(),
            enactor: StrategyEnactor::new(),
            clock,
            last_strategy: None,
        }
    }

    /// A renderer process was created
    pub fn add(&mut self, renderer_id: RendererId) {
        let now = self.clock.now();
        self.registry.add(renderer_id, now);
        self.schedule_recompute();
    }

    /// A renderer process went away
    pub fn remove(&mut self, renderer_id: RendererId) {
        self.registry.remove(renderer_id);
        self.schedule_recompute();
    }

    /// A renderer was just used (e.g. its tab was selected)
    pub fn observe_activity(&mut self, renderer_id: RendererId) {
        let now = self.clock.now();
        if self.registry.observe_activity(renderer_id, now) {
            tracing::debug!(renderer_id, "inactive renderer became active");
            self.schedule_recompute();
        }
    }

    /// A renderer reported its cache usage
    ///
    /// Reports for unknown renderers are dropped without notifying observers.
    pub fn observe_stats(&mut self, renderer_id: RendererId, stats: UsageStats) {
        let Some(stored) = self.registry.observe_stats(renderer_id, stats) else {
            tracing::trace!(renderer_id, "stats for unknown renderer dropped");
            return;
        };
        self.observers.notify(renderer_id, &stored);
    }

    /// Be told about every accepted stats report
    pub fn subscribe_stats<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(RendererId, &UsageStats) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe_stats(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Change the global budget; takes effect at the next recompute
    pub fn set_global_size_limit(&mut self, bytes: u64) {
        self.config.global_size_limit = bytes;
        self.schedule_recompute();
    }

    pub fn global_size_limit(&self) -> u64 {
        self.config.global_size_limit
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    /// Aggregated usage of both groups, for diagnostics
    pub fn usage_summary(&self) -> UsageSummary {
        UsageSummary {
            active: self.registry.usage(Activity::Active),
            inactive: self.registry.usage(Activity::Inactive),
            active_renderers: self.registry.active_count(),
            inactive_renderers: self.registry.inactive_count(),
        }
    }

    /// The strategy enacted by the most recent recompute
    pub fn last_strategy(&self) -> Option<&AllocationStrategy> {
        self.last_strategy.as_ref()
    }

    pub fn is_recompute_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// When the pending recompute becomes due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Counters for recompute requests and the runs they collapsed into
    pub fn recompute_stats(&self) -> DebounceStats {
        self.timer.stats()
    }

    /// Time left until the pending recompute is due
    pub fn time_until_recompute(&self) -> Option<Duration> {
        self.timer.remaining(self.clock.now())
    }

    /// Run the pending recompute if it is due
    ///
    /// Returns the enactment report when a recompute ran.
    pub fn poll(&mut self, processes: &dyn RendererProcessTable) -> Option<EnactReport> {
        if !self.timer.fire_if_due(self.clock.now()) {
            return None;
        }
        self.recompute(processes)
    }

    /// Recompute and enact the allocation now
    ///
    /// Returns `None` if no tactic fit, in which case the previous
    /// allocations stay in place.
    pub fn recompute(&mut self, processes: &dyn RendererProcessTable) -> Option<EnactReport> {
        self.timer.cancel();

        let now = self.clock.now();
        self.registry.find_inactive(now, self.config.inactive_threshold);

        let active = self.registry.group(Activity::Active);
        let inactive = self.registry.group(Activity::Inactive);
        let limit = self.config.global_size_limit;

        let Some(strategy) = compute_strategy(&active, &inactive, limit) else {
            tracing::error!(limit, "no allocation tactic fits the global limit");
            debug_assert!(false, "the divide-evenly tactic must always fit");
            return None;
        };

        let report = self.enactor.enact(&strategy, processes);
        tracing::info!(
            tactics = %strategy.tactics,
            limit,
            active = active.len(),
            inactive = inactive.len(),
            sent = report.sent,
            skipped = report.skipped,
            "revised cache allocation"
        );

        self.last_strategy = Some(strategy);
        Some(report)
    }

    fn schedule_recompute(&mut self) {
        self.timer.schedule(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enactor::testing::FakeProcessTable;
    use crate::enactor::CacheCapacities;
    use cachehost_cache::{AllocationTactic, TacticPair};
    use cachehost_scheduler::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    const MB: u64 = 1024 * 1024;
    const DELAY: Duration = Duration::from_millis(200);

    fn host(limit: u64) -> (CacheManagerHost<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let host = CacheManagerHost::with_clock(HostConfig::with_limit(limit), clock.clone());
        (host, clock)
    }

    #[test]
    fn test_single_active_renderer_gets_whole_budget() {
        let (mut host, clock) = host(16 * MB);
        let table = FakeProcessTable::with_renderers(&[1]);

        host.add(1);
        host.observe_stats(1, UsageStats::with_sizes(10 * MB, 2 * MB));
        clock.advance(DELAY);
        host.poll(&table).unwrap();

        let strategy = host.last_strategy().unwrap();
        assert_eq!(
            strategy.tactics,
            TacticPair::new(
                AllocationTactic::KeepLiveWithHeadroom,
                AllocationTactic::DivideEvenly
            )
        );
        assert_eq!(table.last_sent(1), Some(CacheCapacities::for_capacity(16 * MB)));
    }

    #[test]
    fn test_two_fresh_renderers_split_budget() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1, 2]);

        host.add(1);
        host.add(2);
        clock.advance(DELAY);
        let report = host.poll(&table).unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(table.last_sent(1).unwrap().capacity, 4 * MB);
        assert_eq!(table.last_sent(2).unwrap().capacity, 4 * MB);
    }

    #[test]
    fn test_burst_of_changes_triggers_one_recompute() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1, 2, 3]);

        host.add(1);
        clock.advance(Duration::from_millis(50));
        host.add(2);
        clock.advance(Duration::from_millis(50));
        host.add(3);

        clock.advance(Duration::from_millis(99));
        assert!(host.poll(&table).is_none());
        clock.advance(Duration::from_millis(1));
        assert!(host.poll(&table).is_some());
        assert!(host.poll(&table).is_none());

        for id in 1..=3 {
            assert_eq!(table.sent_count(id), 1);
        }
    }

    #[test]
    fn test_recompute_stats_count_coalesced_requests() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1, 2, 3]);

        host.add(1);
        host.add(2);
        host.add(3);
        clock.advance(DELAY);
        host.poll(&table).unwrap();

        let stats = host.recompute_stats();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.fired, 1);
    }

    #[test]
    fn test_huge_usage_reports_never_exceed_the_limit() {
        let (mut host, clock) = host(u64::MAX);
        let table = FakeProcessTable::with_renderers(&[1, 2]);

        host.add(1);
        host.add(2);
        host.observe_stats(1, UsageStats::with_sizes(u64::MAX / 2 + 1, 0));
        host.observe_stats(2, UsageStats::with_sizes(u64::MAX / 2 + 1, 0));
        clock.advance(DELAY);
        host.poll(&table).unwrap();

        let sent: u128 = [1, 2]
            .into_iter()
            .map(|id| u128::from(table.last_sent(id).unwrap().capacity))
            .sum();
        assert!(sent <= u128::from(u64::MAX));
    }

    #[test]
    fn test_poll_without_changes_does_nothing() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::default();

        clock.advance(Duration::from_secs(10));
        assert!(host.poll(&table).is_none());
        assert!(host.last_strategy().is_none());
    }

    #[test]
    fn test_duplicate_add_is_tolerated() {
        let (mut host, _clock) = host(8 * MB);

        host.add(5);
        host.add(5);

        assert_eq!(host.registry().len(), 1);
        assert_eq!(host.registry().active_count(), 1);
    }

    #[test]
    fn test_stats_for_unknown_renderer_are_ignored() {
        let (mut host, _clock) = host(8 * MB);
        let notified = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&notified);
        host.subscribe_stats(move |_, _| *counter.borrow_mut() += 1);

        host.observe_stats(99, UsageStats::with_sizes(MB, MB));

        assert!(host.registry().is_empty());
        assert!(!host.is_recompute_pending());
        assert_eq!(*notified.borrow(), 0);
    }

    #[test]
    fn test_stats_reports_are_republished() {
        let (mut host, _clock) = host(8 * MB);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription =
            host.subscribe_stats(move |id, stats| sink.borrow_mut().push((id, *stats)));

        host.add(3);
        host.observe_stats(3, UsageStats::with_sizes(7, 1));
        host.unsubscribe_stats(subscription);
        host.observe_stats(3, UsageStats::with_sizes(8, 1));

        assert_eq!(*seen.borrow(), vec![(3, UsageStats::with_sizes(7, 1))]);
    }

    #[test]
    fn test_repeated_stats_give_same_summary() {
        let (mut host, _clock) = host(8 * MB);
        host.add(1);
        host.add(2);
        let stats = UsageStats::with_sizes(3 * MB, MB);

        host.observe_stats(1, stats);
        let once = host.usage_summary();
        host.observe_stats(1, stats);
        let twice = host.usage_summary();

        assert_eq!(once, twice);
        assert_eq!(twice.active, stats);
        assert_eq!(twice.active_renderers, 2);
    }

    #[test]
    fn test_idle_renderer_loses_priority() {
        let (mut host, clock) = host(20 * MB);
        let table = FakeProcessTable::with_renderers(&[1, 2]);

        host.add(1);
        host.add(2);
        host.observe_stats(1, UsageStats::with_sizes(2 * MB, 2 * MB));
        host.observe_stats(2, UsageStats::with_sizes(MB, MB));
        clock.advance(DELAY);
        host.poll(&table);

        // Renderer 1 keeps being used, renderer 2 sits idle.
        clock.advance(Duration::from_secs(4 * 60));
        host.observe_activity(1);
        clock.advance(Duration::from_secs(2 * 60));
        host.remove(99); // any change schedules a recompute
        clock.advance(DELAY);
        host.poll(&table).unwrap();

        let summary = host.usage_summary();
        assert_eq!(summary.active_renderers, 1);
        assert_eq!(summary.inactive_renderers, 1);
        assert_eq!(host.registry().activity(2), Some(Activity::Inactive));

        // 6MB + 2MB reserved, the remaining 12MB split into two shares.
        assert_eq!(table.last_sent(1).unwrap().capacity, 12 * MB);
        assert_eq!(table.last_sent(2).unwrap().capacity, 8 * MB);
    }

    #[test]
    fn test_reactivation_schedules_recompute() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1]);

        host.add(1);
        clock.advance(Duration::from_secs(10 * 60));
        host.recompute(&table);
        assert_eq!(host.registry().activity(1), Some(Activity::Inactive));
        assert!(!host.is_recompute_pending());

        host.observe_activity(1);
        assert!(host.is_recompute_pending());
        assert_eq!(host.registry().activity(1), Some(Activity::Active));

        // Activity from an already active renderer is cheap
        host.recompute(&table);
        host.observe_activity(1);
        assert!(!host.is_recompute_pending());
    }

    #[test]
    fn test_renderer_gone_before_enactment_is_skipped() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1]);

        host.add(1);
        host.add(2);
        clock.advance(DELAY);
        let report = host.poll(&table).unwrap();

        assert_eq!(report, EnactReport { sent: 1, skipped: 1 });
    }

    #[test]
    fn test_remove_drops_renderer_from_next_strategy() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1, 2]);

        host.add(1);
        host.add(2);
        clock.advance(DELAY);
        host.poll(&table);

        host.remove(2);
        clock.advance(DELAY);
        host.poll(&table);

        let strategy = host.last_strategy().unwrap();
        assert_eq!(strategy.len(), 1);
        assert_eq!(strategy.capacity_for(1), Some(8 * MB));
    }

    #[test]
    fn test_new_limit_applies_on_next_recompute() {
        let (mut host, clock) = host(8 * MB);
        let table = FakeProcessTable::with_renderers(&[1]);

        host.add(1);
        clock.advance(DELAY);
        host.poll(&table);
        assert_eq!(table.last_sent(1).unwrap().capacity, 8 * MB);

        host.set_global_size_limit(32 * MB);
        assert_eq!(host.global_size_limit(), 32 * MB);
        assert_eq!(host.time_until_recompute(), Some(DELAY));
        clock.advance(DELAY);
        host.poll(&table);
        assert_eq!(table.last_sent(1).unwrap().capacity, 32 * MB);
    }
}
