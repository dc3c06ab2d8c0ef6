//! Allocation strategist
//!
//! Splits a global byte budget across active and inactive renderers. Each
//! [`TacticPair`] in [`TACTIC_PRIORITY`] is tried in turn; the first one whose
//! reservations fit in the budget wins and the leftover bytes are divided
//! evenly on top of the reservations.

use serde::{Deserialize, Serialize};

use crate::stats::{RendererId, UsageStats};
use crate::tactic::{AllocationTactic, TacticPair, TACTIC_PRIORITY};

/// A renderer taking part in a planning round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMember {
    pub renderer_id: RendererId,
    /// Latest reported usage, if the renderer has reported any
    pub stats: Option<UsageStats>,
}

/// Renderers sharing the same activity state
///
/// Member order is preserved in the resulting strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererGroup {
    members: Vec<GroupMember>,
}

impl RendererGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderer to the group
    pub fn push(&mut self, renderer_id: RendererId, stats: Option<UsageStats>) {
        self.members.push(GroupMember { renderer_id, stats });
    }

    /// Builder form of [`push`](Self::push)
    pub fn with_member(mut self, renderer_id: RendererId, stats: UsageStats) -> Self {
        self.push(renderer_id, Some(stats));
        self
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Usage summed over every member
    pub fn total_usage(&self) -> UsageStats {
        self.members.iter().filter_map(|member| member.stats).sum()
    }

    /// Bytes `tactic` reserves for the whole group
    ///
    /// Sizes are summed without saturating; `None` means the group's
    /// reported usage does not fit in a `u64`.
    pub fn reserved_size(&self, tactic: AllocationTactic) -> Option<u64> {
        let mut live_size = 0u64;
        let mut dead_size = 0u64;
        for stats in self.members.iter().filter_map(|member| member.stats) {
            live_size = live_size.checked_add(stats.live_size)?;
            dead_size = dead_size.checked_add(stats.dead_size)?;
        }
        tactic.checked_reserved_size(&UsageStats::with_sizes(live_size, dead_size))
    }
}

impl FromIterator<(RendererId, Option<UsageStats>)> for RendererGroup {
    fn from_iter<I: IntoIterator<Item = (RendererId, Option<UsageStats>)>>(iter: I) -> Self {
        Self {
            members: iter
                .into_iter()
                .map(|(renderer_id, stats)| GroupMember { renderer_id, stats })
                .collect(),
        }
    }
}

/// Capacity assigned to one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub renderer_id: RendererId,
    pub capacity: u64,
}

/// Result of one planning round
///
/// Allocations for active renderers come first, followed by the inactive ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStrategy {
    /// Tactics that produced this strategy
    pub tactics: TacticPair,
    /// One entry per renderer
    pub allocations: Vec<Allocation>,
}

impl AllocationStrategy {
    /// Sum of all assigned capacities
    pub fn total_capacity(&self) -> u64 {
        self.allocations
            .iter()
            .fold(0u64, |total, a| total.saturating_add(a.capacity))
    }

    /// Capacity assigned to a renderer, if it is part of the strategy
    pub fn capacity_for(&self, renderer_id: RendererId) -> Option<u64> {
        self.allocations
            .iter()
            .find(|a| a.renderer_id == renderer_id)
            .map(|a| a.capacity)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

/// Try to fit one tactic pair into `limit` bytes
///
/// Returns `None` when the reservations of the two groups together exceed
/// the limit, or overflow a `u64`. Otherwise the leftover is split into one share per active
/// renderer plus a single share that all inactive renderers split between
/// them. Integer division rounds each share down, so the total can fall a few
/// bytes short of `limit` but never exceeds it.
pub fn attempt_tactic(
    active_tactic: AllocationTactic,
    active: &RendererGroup,
    inactive_tactic: AllocationTactic,
    inactive: &RendererGroup,
    limit: u64,
) -> Option<AllocationStrategy> {
    let active_size = active.reserved_size(active_tactic)?;
    let inactive_size = inactive.reserved_size(inactive_tactic)?;

    let reserved = active_size.checked_add(inactive_size)?;
    if reserved > limit {
        return None;
    }

    let total_extra = limit - reserved;

    let mut shares = active.len() as u64;
    let mut inactive_extra = 0;
    if !inactive.is_empty() {
        shares += 1;
        inactive_extra = total_extra / shares;
    }
    let active_extra = total_extra - inactive_extra;

    let mut allocations = Vec::with_capacity(active.len() + inactive.len());
    distribute(active, active_tactic, active_extra, &mut allocations);
    distribute(inactive, inactive_tactic, inactive_extra, &mut allocations);

    Some(AllocationStrategy {
        tactics: TacticPair::new(active_tactic, inactive_tactic),
        allocations,
    })
}

fn distribute(
    group: &RendererGroup,
    tactic: AllocationTactic,
    extra: u64,
    allocations: &mut Vec<Allocation>,
) {
    if group.is_empty() {
        return;
    }

    let extra_each = extra / group.len() as u64;
    for member in group.members() {
        let reserved = member
            .stats
            .map(|stats| tactic.reserved_size(&stats))
            .unwrap_or(0);
        allocations.push(Allocation {
            renderer_id: member.renderer_id,
            capacity: extra_each.saturating_add(reserved),
        });
    }
}

/// Pick the first tactic pair in [`TACTIC_PRIORITY`] that fits in `limit`
///
/// The final pair reserves nothing, so `None` can only come back if the
/// reservation arithmetic itself is broken.
pub fn compute_strategy(
    active: &RendererGroup,
    inactive: &RendererGroup,
    limit: u64,
) -> Option<AllocationStrategy> {
    for pair in TACTIC_PRIORITY {
        if let Some(strategy) = attempt_tactic(pair.active, active, pair.inactive, inactive, limit)
        {
            tracing::debug!(tactics = %pair, limit, "allocation tactic fits");
            return Some(strategy);
        }
        tracing::trace!(tactics = %pair, limit, "allocation tactic does not fit");
    }
    None
}
