//! Allocation tactics
//!
//! A tactic decides how many bytes to reserve for a group of renderers before
//! the rest of the budget is shared out evenly. Tactics that reserve more
//! avoid more evictions but need a larger budget to fit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stats::UsageStats;

/// How much space to reserve for a renderer (or a group of renderers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTactic {
    /// Reserve nothing; the whole budget is divided evenly
    DivideEvenly,

    /// Reserve enough to keep every live object
    KeepLive,

    /// Reserve half again what the live objects use
    KeepLiveWithHeadroom,

    /// Reserve enough to keep every live and dead object
    KeepCurrent,

    /// Reserve half again what the live and dead objects use
    KeepCurrentWithHeadroom,
}

impl AllocationTactic {
    /// Bytes this tactic reserves for the given usage
    pub fn reserved_size(self, stats: &UsageStats) -> u64 {
        match self {
            AllocationTactic::DivideEvenly => 0,
            AllocationTactic::KeepLive => stats.live_size,
            AllocationTactic::KeepLiveWithHeadroom => {
                with_headroom(AllocationTactic::KeepLive.reserved_size(stats))
            }
            AllocationTactic::KeepCurrent => stats.current_size(),
            AllocationTactic::KeepCurrentWithHeadroom => {
                with_headroom(AllocationTactic::KeepCurrent.reserved_size(stats))
            }
        }
    }

    /// Like [`reserved_size`](Self::reserved_size), but `None` if the
    /// reservation does not fit in a `u64`
    pub fn checked_reserved_size(self, stats: &UsageStats) -> Option<u64> {
        match self {
            AllocationTactic::DivideEvenly => Some(0),
            AllocationTactic::KeepLive => Some(stats.live_size),
            AllocationTactic::KeepLiveWithHeadroom => checked_headroom(stats.live_size),
            AllocationTactic::KeepCurrent => stats.live_size.checked_add(stats.dead_size),
            AllocationTactic::KeepCurrentWithHeadroom => {
                checked_headroom(stats.live_size.checked_add(stats.dead_size)?)
            }
        }
    }

    /// Short name used in logs and CLI output
    pub fn name(self) -> &'static str {
        match self {
            AllocationTactic::DivideEvenly => "divide_evenly",
            AllocationTactic::KeepLive => "keep_live",
            AllocationTactic::KeepLiveWithHeadroom => "keep_live_with_headroom",
            AllocationTactic::KeepCurrent => "keep_current",
            AllocationTactic::KeepCurrentWithHeadroom => "keep_current_with_headroom",
        }
    }
}

impl fmt::Display for AllocationTactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// 3/2 of `size`, rounded down.
fn with_headroom(size: u64) -> u64 {
    (size / 2).saturating_mul(3).saturating_add((size % 2) * 3 / 2)
}

fn checked_headroom(size: u64) -> Option<u64> {
    size.checked_add(size / 2)
}

/// The tactics applied to active and inactive renderers in one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TacticPair {
    pub active: AllocationTactic,
    pub inactive: AllocationTactic,
}

impl TacticPair {
    pub const fn new(active: AllocationTactic, inactive: AllocationTactic) -> Self {
        Self { active, inactive }
    }
}

impl fmt::Display for TacticPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "active={} inactive={}", self.active, self.inactive)
    }
}

/// Tactic pairs in the order they are tried
///
/// The last pair reserves nothing and therefore fits any budget.
pub const TACTIC_PRIORITY: [TacticPair; 5] = [
    TacticPair::new(
        AllocationTactic::KeepCurrentWithHeadroom,
        AllocationTactic::KeepCurrent,
    ),
    TacticPair::new(
        AllocationTactic::KeepCurrentWithHeadroom,
        AllocationTactic::KeepLive,
    ),
    TacticPair::new(
        AllocationTactic::KeepLiveWithHeadroom,
        AllocationTactic::DivideEvenly,
    ),
    TacticPair::new(AllocationTactic::KeepLive, AllocationTactic::DivideEvenly),
    TacticPair::new(
        AllocationTactic::DivideEvenly,
        AllocationTactic::DivideEvenly,
    ),
];
