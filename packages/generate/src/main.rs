#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI for building the house price map artifacts.
//!
//! Reads raw sales, predictions, postcode references, boundary polygons,
//! and the live listings snapshot from a data root, and writes the JSON
//! and `GeoJSON` tree the map frontend serves.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use price_map_cli_utils::IndicatifProgress;
use price_map_generate::{GenerateArgs, Targets, run_with_progress};
use price_map_source::registry::{all_timelines, find_timeline};

/// Environment variable consulted when `--root` is not given.
const ROOT_ENV: &str = "PRICE_MAP_ROOT";

#[derive(Parser)]
#[command(name = "price_map_generate", about = "House price map artifact generator")]
struct Cli {
    /// Data root holding `PPD/`, `predictions/`, and the reference data
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Artifact output directory (defaults to `<root>/data`)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Place listings without coordinates around their district center in
    /// a separate approximate layer
    #[arg(long, global = true)]
    approximate_listings: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate polygons, every timeline, and the live overlay
    All,
    /// Generate a single timeline's stats, points, and ranges
    Timeline {
        /// Timeline id (see `timelines`)
        id: String,
    },
    /// Generate only the live listings overlay
    Live,
    /// Publish only the boundary polygons
    Polygons,
    /// List configured timelines
    Timelines,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = price_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let targets = match cli.command.unwrap_or(Commands::All) {
        Commands::All => Targets::all(),
        Commands::Timeline { id } => Targets {
            timelines: vec![find_timeline(&id)?],
            ..Targets::default()
        },
        Commands::Live => Targets {
            live: true,
            ..Targets::default()
        },
        Commands::Polygons => Targets {
            polygons: true,
            ..Targets::default()
        },
        Commands::Timelines => {
            for def in all_timelines() {
                println!(
                    "{:<12} {:<28} {}/ -> {}/",
                    def.id, def.name, def.input_dir, def.output_dir
                );
            }
            return Ok(());
        }
    };

    let root = match cli.root {
        Some(root) => root,
        None => match std::env::var_os(ROOT_ENV) {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir()?,
        },
    };

    let mut args = GenerateArgs::for_root(root);
    if let Some(output_dir) = cli.output_dir {
        args.output_dir = output_dir;
    }
    args.approximate_listings = cli.approximate_listings;

    let progress = |name: &str| IndicatifProgress::files_bar(&multi, name);
    let report = run_with_progress(&args, &targets, &progress).await?;

    for timeline in &report.timelines {
        log::info!(
            "{}: {} months, {} points, {} rows rejected",
            timeline.id,
            timeline.output.months.len(),
            timeline.output.points,
            timeline.rejected
        );
    }
    if let Some(live) = report.live {
        log::info!(
            "live: {} listings, {} plotted",
            live.total,
            live.geocoded
        );
    }

    Ok(())
}
