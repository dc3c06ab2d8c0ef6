use anyhow::{Context, Result};
use cachehost_cache::{default_size_limit_for, physical_ram_bytes};
use cachehost_core::HostConfig;
use cachehost_storage::PreferenceStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

mod logging;
mod plan;
mod replay;
mod size;

pub use size::parse_size;

#[derive(Debug, Parser)]
#[command(name = "cachehost")]
#[command(about = "Renderer cache allocation planner")]
pub struct Cli {
    /// Directory holding preferences.json (defaults to the user config dir)
    #[arg(long, global = true, value_name = "DIR")]
    prefs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compute the allocation strategy for a scenario file.
    Plan {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
        /// Global limit, e.g. 16MB or 16777216
        #[arg(long, value_parser = parse_size)]
        limit: Option<u64>,
    },
    /// Replay a script of renderer events and print every enacted strategy.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Global limit, e.g. 32MB; overrides the script and preferences
        #[arg(long, value_parser = parse_size)]
        limit: Option<u64>,
    },
    /// Print the physical memory, derived default and configured limit.
    DefaultLimit,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct DefaultLimitOutput {
    physical_ram_bytes: Option<u64>,
    default_limit: u64,
    configured_limit: u64,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    logging::init_tracing("warn")?;

    match cli.command {
        Commands::Plan { scenario, limit } => run_plan(cli.prefs_dir.as_deref(), &scenario, limit),
        Commands::Replay { script, limit } => {
            run_replay(cli.prefs_dir.as_deref(), &script, limit)
        }
        Commands::DefaultLimit => run_default_limit(cli.prefs_dir.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_plan(prefs_dir: Option<&Path>, scenario_path: &Path, limit: Option<u64>) -> Result<()> {
    let scenario = plan::load_scenario(scenario_path)?;

    let limit = match limit.or(scenario.limit) {
        Some(limit) => limit,
        None => load_config(prefs_dir)?.global_size_limit,
    };

    print_json(&plan::plan(&scenario, limit)?)
}

fn run_replay(prefs_dir: Option<&Path>, script_path: &Path, limit: Option<u64>) -> Result<()> {
    let script = replay::load_script(script_path)?;

    let mut config = replay::script_config(&script, load_config(prefs_dir)?);
    if let Some(limit) = limit {
        config.global_size_limit = limit;
    }

    print_json(&replay::replay(&script, config))
}

fn run_default_limit(prefs_dir: Option<&Path>) -> Result<()> {
    let ram = physical_ram_bytes();
    let payload = DefaultLimitOutput {
        physical_ram_bytes: ram,
        default_limit: default_size_limit_for(ram),
        configured_limit: load_config(prefs_dir)?.global_size_limit,
    };

    print_json(&payload)
}

fn load_config(prefs_dir: Option<&Path>) -> Result<HostConfig> {
    let store = match prefs_dir {
        Some(dir) => PreferenceStore::with_root(dir),
        None => PreferenceStore::from_default_location()?,
    };

    tracing::debug!(root = %store.root().display(), "loading host configuration");
    HostConfig::load(&store)
        .with_context(|| format!("failed to load configuration from {}", store.root().display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
