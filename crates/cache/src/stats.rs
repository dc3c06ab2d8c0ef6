//! Per-renderer cache usage statistics
//!
//! Renderers periodically report how their object cache is being used. The
//! host keeps the latest report for each renderer and sums reports across
//! groups of renderers when planning an allocation.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Identifier of a renderer process.
///
/// Opaque to this crate; it is a key into the embedder's process table.
pub type RendererId = u32;

/// Object cache usage reported by a renderer
///
/// `live_size + dead_size` approximates the memory currently held by the
/// renderer's cache. It is not a hard bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    /// Capacity the renderer is currently running with
    pub capacity: u64,
    /// Bytes held by objects still in use by a page
    pub live_size: u64,
    /// Bytes held by objects kept only to avoid a reload
    pub dead_size: u64,
    /// Lower bound for dead objects the renderer protects from eviction
    pub min_dead_capacity: u64,
    /// Upper bound for dead objects the renderer will retain
    pub max_dead_capacity: u64,
}

impl UsageStats {
    /// Stats with only the live and dead sizes set
    pub fn with_sizes(live_size: u64, dead_size: u64) -> Self {
        Self {
            live_size,
            dead_size,
            ..Default::default()
        }
    }

    /// Live plus dead bytes
    pub fn current_size(&self) -> u64 {
        self.live_size.saturating_add(self.dead_size)
    }
}

impl AddAssign for UsageStats {
    fn add_assign(&mut self, other: Self) {
        self.capacity = self.capacity.saturating_add(other.capacity);
        self.live_size = self.live_size.saturating_add(other.live_size);
        self.dead_size = self.dead_size.saturating_add(other.dead_size);
        self.min_dead_capacity = self.min_dead_capacity.saturating_add(other.min_dead_capacity);
        self.max_dead_capacity = self.max_dead_capacity.saturating_add(other.max_dead_capacity);
    }
}

impl Add for UsageStats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Sum for UsageStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a UsageStats> for UsageStats {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
