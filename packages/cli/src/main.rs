#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line entry point for the hotspot pipelines.
//!
//! Each subcommand is an independent batch job that writes one artifact.
//! Uses `indicatif-log-bridge` (via [`hotspot_cli_utils::init_logger`]) so
//! log lines and fetch progress bars share the terminal.

mod config;
mod pipelines;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::pipelines::output_path;

#[derive(Parser)]
#[command(
    name = "hotspot",
    about = "Spatial hotspot analysis of Boston public safety and permit data"
)]
struct Cli {
    /// TOML configuration file. Keys it omits keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output file, replacing the subcommand's default file name
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank (offense, hour) groups by location entropy and map one offense
    Entropy {
        /// Crime incident CSV export
        #[arg(long)]
        csv: PathBuf,
        /// Persist the imported table in this `DuckDB` file instead of memory
        #[arg(long)]
        db: Option<PathBuf>,
        /// Print only the first N ranked groups
        #[arg(long)]
        top: Option<usize>,
        /// Seed for heatmap point sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Heat overlay of a table with a combined "(lat, lon)" column
    Heatmap {
        /// CSV export to load
        #[arg(long)]
        csv: PathBuf,
        /// Persist the imported table in this `DuckDB` file instead of memory
        #[arg(long)]
        db: Option<PathBuf>,
        /// Name of the location column
        #[arg(long)]
        column: Option<String>,
        /// Maximum number of points drawn
        #[arg(long)]
        sample_cap: Option<usize>,
        /// Seed for point sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Map the change in building permit density between two years
    PermitChange {
        /// Earlier year
        #[arg(long)]
        from: Option<i32>,
        /// Later year
        #[arg(long)]
        to: Option<i32>,
        /// Stop paging once more than this many rows per year are fetched
        #[arg(long)]
        max_records: Option<u64>,
        /// Retries per request on transient failures
        #[arg(long)]
        retries: Option<u32>,
    },
    /// Plot daily 311 needle pickup requests
    NeedleTimeseries {
        /// Stop paging once more than this many rows per resource are fetched
        #[arg(long)]
        max_records: Option<u64>,
        /// Retries per request on transient failures
        #[arg(long)]
        retries: Option<u32>,
    },
}

fn apply_retries(config: &mut AppConfig, retries: Option<u32>) {
    if let Some(retries) = retries {
        config.source.paging.retry.max_retries = retries;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = hotspot_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    let output = cli.output.as_deref();

    match cli.command {
        Commands::Entropy {
            csv,
            db,
            top,
            seed,
        } => {
            if top.is_some() {
                config.crime.top = top;
            }
            if seed.is_some() {
                config.crime.heatmap.seed = seed;
            }
            let output = output_path(output, &config.crime.output);
            pipelines::entropy::run(&config.crime, &csv, db.as_deref(), &output).await?;
        }
        Commands::Heatmap {
            csv,
            db,
            column,
            sample_cap,
            seed,
        } => {
            if let Some(column) = column {
                config.heatmap.location_column = column;
            }
            if let Some(cap) = sample_cap {
                config.heatmap.heatmap.sample_cap = Some(cap);
            }
            if seed.is_some() {
                config.heatmap.heatmap.seed = seed;
            }
            let output = output_path(output, &config.heatmap.output);
            pipelines::location_heatmap::run(&config.heatmap, &csv, db.as_deref(), &output)
                .await?;
        }
        Commands::PermitChange {
            from,
            to,
            max_records,
            retries,
        } => {
            if let Some(from) = from {
                config.permits.from_year = from;
            }
            if let Some(to) = to {
                config.permits.to_year = to;
            }
            if let Some(max) = max_records {
                config.source.paging.max_records = max;
            }
            apply_retries(&mut config, retries);
            let output = output_path(output, &config.permits.output);
            pipelines::permits::run(&config.permits, &config.source, &output, &multi).await?;
        }
        Commands::NeedleTimeseries {
            max_records,
            retries,
        } => {
            if let Some(max) = max_records {
                config.needles.max_records = max;
            }
            apply_retries(&mut config, retries);
            let output = output_path(output, &config.needles.output);
            pipelines::needles::run(&config.needles, &config.source, &output, &multi).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_permit_change_with_global_flags() {
        let cli = Cli::try_parse_from([
            "hotspot",
            "permit-change",
            "--from",
            "2022",
            "--output",
            "change.html",
            "--retries",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("change.html")));
        assert!(matches!(
            cli.command,
            Commands::PermitChange {
                from: Some(2022),
                to: None,
                retries: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn retries_override_keeps_backoff() {
        let mut config = AppConfig::default();
        apply_retries(&mut config, Some(4));
        assert_eq!(config.source.paging.retry.max_retries, 4);
        assert!((config.source.paging.retry.base_delay_secs - 2.0).abs() < f64::EPSILON);
    }
}
