//! Strategy enactor
//!
//! Pushes a computed [`AllocationStrategy`] out to the renderers. Delivery is
//! fire-and-forget; renderers that exited since the strategy was computed are
//! skipped.

use cachehost_cache::{AllocationStrategy, RendererId};

/// Capacity instruction sent to one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapacities {
    /// Dead bytes the renderer should protect from eviction
    pub min_dead_capacity: u64,
    /// Dead bytes the renderer may retain
    pub max_dead_capacity: u64,
    /// Total bytes the renderer's cache may use
    pub capacity: u64,
}

impl CacheCapacities {
    /// Instruction for a renderer granted `capacity` bytes
    ///
    /// Dead objects get no protected share but may fill the whole
    /// allocation; the renderer balances live and dead objects itself.
    pub fn for_capacity(capacity: u64) -> Self {
        Self {
            min_dead_capacity: 0,
            max_dead_capacity: capacity,
            capacity,
        }
    }
}

/// Message channel to a live renderer process
pub trait RendererChannel {
    /// Queue a capacity update; must not block
    fn send_set_cache_capacities(&self, capacities: CacheCapacities);
}

/// Lookup from renderer id to its live process
pub trait RendererProcessTable {
    /// The renderer's channel, or `None` if the process is gone
    fn lookup(&self, renderer_id: RendererId) -> Option<&dyn RendererChannel>;
}

/// Outcome of one enactment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnactReport {
    /// Renderers that were sent an update
    pub sent: usize,
    /// Renderers no longer present in the process table
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyEnactor;

impl StrategyEnactor {
    pub fn new() -> Self {
        Self
    }

    pub fn enact(
        &self,
        strategy: &AllocationStrategy,
        processes: &dyn RendererProcessTable,
    ) -> EnactReport {
        let mut report = EnactReport::default();

        for allocation in &strategy.allocations {
            match processes.lookup(allocation.renderer_id) {
                Some(channel) => {
                    channel.send_set_cache_capacities(CacheCapacities::for_capacity(
                        allocation.capacity,
                    ));
                    report.sent += 1;
                }
                None => {
                    tracing::debug!(
                        renderer_id = allocation.renderer_id,
                        "renderer exited before its allocation was sent"
                    );
                    report.skipped += 1;
                }
            }
        }

        report
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeProcessTable;
    use super::*;
    use cachehost_cache::{Allocation, TACTIC_PRIORITY};

    fn strategy(allocations: &[(RendererId, u64)]) -> AllocationStrategy {
        AllocationStrategy {
            tactics: TACTIC_PRIORITY[0],
            allocations: allocations
                .iter()
                .map(|&(renderer_id, capacity)| Allocation { renderer_id, capacity })
                .collect(),
        }
    }

    #[test]
    fn test_sends_capacity_with_unprotected_dead_objects() {
        let table = FakeProcessTable::with_renderers(&[1, 2]);

        let report = StrategyEnactor::new().enact(&strategy(&[(1, 100), (2, 50)]), &table);

        assert_eq!(report, EnactReport { sent: 2, skipped: 0 });
        assert_eq!(
            table.last_sent(1),
            Some(CacheCapacities {
                min_dead_capacity: 0,
                max_dead_capacity: 100,
                capacity: 100
            })
        );
        assert_eq!(table.last_sent(2).unwrap().capacity, 50);
    }

    #[test]
    fn test_skips_renderers_that_exited() {
        let table = FakeProcessTable::with_renderers(&[1]);

        let report = StrategyEnactor::new().enact(&strategy(&[(1, 10), (9, 10)]), &table);

        assert_eq!(report, EnactReport { sent: 1, skipped: 1 });
        assert_eq!(table.sent_count(1), 1);
    }
}
