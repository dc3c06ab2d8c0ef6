//! Cache Host Core Library
//!
//! Host-side management of renderer object cache capacity.
//!
//! The [`CacheManagerHost`] tracks every renderer process, classifies each as
//! active or inactive, and periodically divides the global cache budget
//! between them, sending each renderer its new capacity.
//!
//! # Example
//!
//! ```
//! use cachehost_core::{
//!     CacheCapacities, CacheManagerHost, HostConfig, RendererChannel, RendererProcessTable,
//! };
//! use cachehost_cache::UsageStats;
//! use std::cell::Cell;
//!
//! struct Renderer {
//!     capacity: Cell<u64>,
//! }
//!
//! impl RendererChannel for Renderer {
//!     fn send_set_cache_capacities(&self, capacities: CacheCapacities) {
//!         self.capacity.set(capacities.capacity);
//!     }
//! }
//!
//! struct OneRenderer(Renderer);
//!
//! impl RendererProcessTable for OneRenderer {
//!     fn lookup(&self, id: u32) -> Option<&dyn RendererChannel> {
//!         (id == 7).then_some(&self.0 as &dyn RendererChannel)
//!     }
//! }
//!
//! let processes = OneRenderer(Renderer { capacity: Cell::new(0) });
//! let mut host = CacheManagerHost::new(HostConfig::with_limit(16 << 20));
//!
//! host.add(7);
//! host.observe_stats(7, UsageStats::with_sizes(1 << 20, 0));
//! host.recompute(&processes);
//!
//! assert_eq!(processes.0.capacity.get(), 16 << 20);
//! ```

pub mod config;
pub mod enactor;
pub mod error;
pub mod host;
pub mod observer;
pub mod registry;

pub use config::HostConfig;
pub use enactor::{
    CacheCapacities, EnactReport, RendererChannel, RendererProcessTable, StrategyEnactor,
};
pub use error::{ConfigError, ConfigResult};
pub use host::{CacheManagerHost, UsageSummary};
pub use observer::{StatsObservers, SubscriptionId};
pub use registry::{Activity, RendererInfo, RendererRegistry, DEFAULT_INACTIVE_THRESHOLD};
