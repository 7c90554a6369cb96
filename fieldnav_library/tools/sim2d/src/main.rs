//! # sim2d - Headless mission runner
//!
//! Usage:
//!   sim2d --mission mission.yaml                    # Empty world, default gains
//!   sim2d --mission m.yaml --world w.yaml           # With obstacles
//!   sim2d --mission m.yaml --config nav.yaml        # Custom gains
//!   sim2d --mission m.yaml --json > run.json        # Full run as JSON
//!   sim2d --dump-config > nav.yaml                  # Default navigator config
//!
//! Log verbosity follows RUST_LOG, e.g. `RUST_LOG=fieldnav_library=debug`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fieldnav_core::params::{self, ParamFormat};
use fieldnav_library::config::NavConfig;
use fieldnav_library::messages::MissionPlan;
use sim2d::{MissionRunner, SimConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "fieldnav_core=info,fieldnav_library=info,sim2d=info";

/// CLI arguments
#[derive(Parser)]
#[command(name = "sim2d")]
#[command(about = "Run a fieldnav mission against a simulated robot")]
struct Args {
    /// Mission plan (YAML, TOML or JSON)
    #[arg(long, required_unless_present = "dump_config")]
    mission: Option<PathBuf>,

    /// Navigator configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// World description file
    #[arg(long)]
    world: Option<PathBuf>,

    /// Tick limit before the run is cut off
    #[arg(long, default_value = "2400")]
    max_ticks: u64,

    /// Pace ticks against the wall clock, safety monitor on its own thread
    #[arg(long)]
    realtime: bool,

    /// Raise the safety halt below this body clearance (cm)
    #[arg(long)]
    halt_clearance: Option<f64>,

    /// Print the full run (report, records, trajectory) as JSON
    #[arg(long)]
    json: bool,

    /// Print the default navigator configuration as YAML and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.dump_config {
        print!("{}", params::to_string(&NavConfig::default(), ParamFormat::Yaml)?);
        return Ok(());
    }

    let nav = match &args.config {
        Some(path) => NavConfig::load(path)
            .with_context(|| format!("loading navigator config {}", path.display()))?,
        None => NavConfig::default(),
    };
    let Some(mission_path) = args.mission.as_ref() else {
        bail!("--mission is required");
    };
    let plan = MissionPlan::load(mission_path)
        .with_context(|| format!("loading mission {}", mission_path.display()))?;
    let world: SimConfig = match &args.world {
        Some(path) => params::load(path)
            .with_context(|| format!("loading world {}", path.display()))?,
        None => SimConfig::default(),
    };

    let run = MissionRunner::new(nav, plan.clone(), world)
        .max_ticks(args.max_ticks)
        .realtime(args.realtime)
        .halt_below_clearance(args.halt_clearance)
        .run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    }

    let report = &run.report;
    info!(
        state = %report.state,
        ticks = report.ticks,
        reached = report.waypoints_reached,
        traveled = format!("{:.1}", report.distance_traveled),
        collisions = report.collisions,
        stalls = report.stalls,
        trap_episodes = report.trap_episodes,
        final_distance = format!("{:.1}", run.final_distance(&plan)),
        closest_approach = format!("{:.1}", run.closest_approach),
        "run summary"
    );

    if !report.succeeded() {
        bail!("mission did not complete: {}", report.state);
    }
    Ok(())
}
