//! One-off strategy computation from a scenario file.

use anyhow::{Context, Result};
use cachehost_cache::{
    compute_strategy, Allocation, RendererGroup, RendererId, TacticPair, UsageStats,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Global limit in bytes; `--limit` takes precedence
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub active: Vec<ScenarioRenderer>,
    #[serde(default)]
    pub inactive: Vec<ScenarioRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioRenderer {
    pub id: RendererId,
    #[serde(default)]
    pub stats: Option<UsageStats>,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub limit: u64,
    pub tactics: TacticPair,
    pub allocations: Vec<Allocation>,
    pub total_capacity: u64,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

pub fn plan(scenario: &Scenario, limit: u64) -> Result<PlanOutput> {
    let active = group(&scenario.active);
    let inactive = group(&scenario.inactive);

    let strategy = compute_strategy(&active, &inactive, limit)
        .context("no allocation tactic fits the limit")?;

    Ok(PlanOutput {
        limit,
        tactics: strategy.tactics,
        total_capacity: strategy.total_capacity(),
        allocations: strategy.allocations,
    })
}

fn group(renderers: &[ScenarioRenderer]) -> RendererGroup {
    renderers.iter().map(|r| (r.id, r.stats)).collect()
}
