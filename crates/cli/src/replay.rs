//! Drive a [`CacheManagerHost`] through a scripted sequence of renderer events.
//!
//! Time only moves on `advance` events. Every recompute that runs is recorded
//! with the capacity updates it sent.

use anyhow::{Context, Result};
use cachehost_cache::{RendererId, TacticPair, UsageStats};
use cachehost_core::{
    CacheCapacities, CacheManagerHost, HostConfig, RendererChannel, RendererProcessTable,
};
use cachehost_scheduler::ManualClock;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub inactive_threshold_secs: Option<u64>,
    #[serde(default)]
    pub recompute_delay_ms: Option<u64>,
    pub events: Vec<ReplayEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Renderer process created
    Add { renderer: RendererId },
    /// Renderer process destroyed and unregistered
    Remove { renderer: RendererId },
    /// Renderer process exited but the host has not been told yet
    Exit { renderer: RendererId },
    /// Renderer was used
    Activity { renderer: RendererId },
    /// Renderer reported usage
    Stats { renderer: RendererId, stats: UsageStats },
    /// Global limit changed
    SetLimit { bytes: u64 },
    /// Let time pass
    Advance { ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityUpdate {
    pub renderer: RendererId,
    pub min_dead_capacity: u64,
    pub max_dead_capacity: u64,
    pub capacity: u64,
}

#[derive(Debug, Serialize)]
pub struct Enactment {
    pub at_ms: u64,
    pub tactics: TacticPair,
    pub updates: Vec<CapacityUpdate>,
    pub skipped: usize,
}

/// How recompute requests were debounced over the whole replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulingSummary {
    pub requests: u64,
    pub coalesced: u64,
    pub fired: u64,
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub limit: u64,
    pub enactments: Vec<Enactment>,
    pub active: Vec<RendererId>,
    pub inactive: Vec<RendererId>,
    pub recompute_pending: bool,
    pub scheduling: SchedulingSummary,
}

type Outbox = Rc<RefCell<Vec<CapacityUpdate>>>;

struct ReplayChannel {
    renderer: RendererId,
    outbox: Outbox,
}

impl RendererChannel for ReplayChannel {
    fn send_set_cache_capacities(&self, capacities: CacheCapacities) {
        self.outbox.borrow_mut().push(CapacityUpdate {
            renderer: self.renderer,
            min_dead_capacity: capacities.min_dead_capacity,
            max_dead_capacity: capacities.max_dead_capacity,
            capacity: capacities.capacity,
        });
    }
}

#[derive(Default)]
struct ReplayProcesses {
    outbox: Outbox,
    live: BTreeMap<RendererId, ReplayChannel>,
}

impl ReplayProcesses {
    fn spawn(&mut self, renderer: RendererId) {
        let channel = ReplayChannel {
            renderer,
            outbox: Rc::clone(&self.outbox),
        };
        self.live.insert(renderer, channel);
    }

    fn exit(&mut self, renderer: RendererId) {
        self.live.remove(&renderer);
    }

    fn drain(&self) -> Vec<CapacityUpdate> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }
}

impl RendererProcessTable for ReplayProcesses {
    fn lookup(&self, renderer_id: RendererId) -> Option<&dyn RendererChannel> {
        self.live
            .get(&renderer_id)
            .map(|channel| channel as &dyn RendererChannel)
    }
}

pub fn load_script(path: &Path) -> Result<ReplayScript> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read replay script {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse replay script {}", path.display()))
}

/// Build the host configuration for a script on top of `base`.
pub fn script_config(script: &ReplayScript, base: HostConfig) -> HostConfig {
    let mut config = base;
    if let Some(limit) = script.limit {
        config.global_size_limit = limit;
    }
    if let Some(secs) = script.inactive_threshold_secs {
        config.inactive_threshold = Duration::from_secs(secs);
    }
    if let Some(ms) = script.recompute_delay_ms {
        config.recompute_delay = Duration::from_millis(ms);
    }
    config
}

struct Replayer {
    clock: ManualClock,
    host: CacheManagerHost<ManualClock>,
    processes: ReplayProcesses,
    elapsed: Duration,
    enactments: Vec<Enactment>,
}

impl Replayer {
    fn new(config: HostConfig) -> Self {
        let clock = ManualClock::new();
        Self {
            host: CacheManagerHost::with_clock(config, clock.clone()),
            clock,
            processes: ReplayProcesses::default(),
            elapsed: Duration::ZERO,
            enactments: Vec::new(),
        }
    }

    fn apply(&mut self, event: &ReplayEvent) {
        match *event {
            ReplayEvent::Add { renderer } => {
                self.processes.spawn(renderer);
                self.host.add(renderer);
            }
            ReplayEvent::Remove { renderer } => {
                self.processes.exit(renderer);
                self.host.remove(renderer);
            }
            ReplayEvent::Exit { renderer } => self.processes.exit(renderer),
            ReplayEvent::Activity { renderer } => self.host.observe_activity(renderer),
            ReplayEvent::Stats { renderer, stats } => self.host.observe_stats(renderer, stats),
            ReplayEvent::SetLimit { bytes } => self.host.set_global_size_limit(bytes),
            ReplayEvent::Advance { ms } => self.advance(Duration::from_millis(ms)),
        }
    }

    // Step to each recompute deadline inside the window so enactments are
    // stamped with the time they actually ran.
    fn advance(&mut self, by: Duration) {
        let target = self.elapsed + by;

        while let Some(remaining) = self.host.time_until_recompute() {
            if self.elapsed + remaining > target {
                break;
            }
            self.step(remaining);
            self.poll();
        }

        let rest = target.saturating_sub(self.elapsed);
        self.step(rest);
        self.poll();
    }

    fn step(&mut self, by: Duration) {
        self.clock.advance(by);
        self.elapsed += by;
    }

    fn poll(&mut self) {
        let Some(report) = self.host.poll(&self.processes) else {
            return;
        };
        let Some(strategy) = self.host.last_strategy() else {
            return;
        };

        self.enactments.push(Enactment {
            at_ms: self.elapsed.as_millis() as u64,
            tactics: strategy.tactics,
            updates: self.processes.drain(),
            skipped: report.skipped,
        });
    }

    fn finish(self) -> ReplayOutput {
        let registry = self.host.registry();
        let stats = self.host.recompute_stats();
        ReplayOutput {
            limit: self.host.global_size_limit(),
            active: registry.active_ids().collect(),
            inactive: registry.inactive_ids().collect(),
            recompute_pending: self.host.is_recompute_pending(),
            scheduling: SchedulingSummary {
                requests: stats.requests,
                coalesced: stats.coalesced,
                fired: stats.fired,
            },
            enactments: self.enactments,
        }
    }
}

pub fn replay(script: &ReplayScript, config: HostConfig) -> ReplayOutput {
    let mut replayer = Replayer::new(config);
    for event in &script.events {
        replayer.apply(event);
    }
    replayer.finish()
}
