//! Renderer Cache Allocation Library
//!
//! Plans how a global memory budget for object caches is split across
//! renderer processes.
//!
//! Renderers are split into two groups: *active* renderers, which the user
//! interacted with recently, and *inactive* ones. For each group an
//! [`AllocationTactic`] decides how many bytes to reserve based on the usage
//! the renderers reported; whatever is left of the budget is then divided
//! evenly. Tactic pairs are tried from the most generous to the least, so
//! when memory is tight the plan falls back to simply splitting the budget.
//!
//! # Example
//!
//! ```
//! use cachehost_cache::{compute_strategy, RendererGroup, UsageStats};
//!
//! const MB: u64 = 1024 * 1024;
//!
//! let active = RendererGroup::new().with_member(1, UsageStats::with_sizes(10 * MB, 2 * MB));
//! let inactive = RendererGroup::new();
//!
//! let strategy = compute_strategy(&active, &inactive, 16 * MB).unwrap();
//! assert_eq!(strategy.capacity_for(1), Some(16 * MB));
//! ```

pub mod limit;
pub mod stats;
pub mod strategy;
pub mod tactic;

pub use limit::{
    default_size_limit, default_size_limit_for, physical_ram_bytes, DEFAULT_GLOBAL_SIZE_LIMIT,
};
pub use stats::{RendererId, UsageStats};
pub use strategy::{
    attempt_tactic, compute_strategy, Allocation, AllocationStrategy, GroupMember, RendererGroup,
};
pub use tactic::{AllocationTactic, TacticPair, TACTIC_PRIORITY};
