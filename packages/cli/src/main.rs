#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for retail site scoring.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use site_scout_cli::config::{Config, DEFAULT_CONFIG_PATH};
use site_scout_cli::pipeline::format_top;

/// Rows of the ranked report printed after a `score` run.
const PRINTED_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "site_scout", about = "Rank census block groups as retail sites")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load zones and tables, score every zone, and write the ranked report
    Score {
        /// Override `top_n` from the config file
        #[arg(long)]
        top_n: Option<usize>,
        /// Override the report path from the config file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the configured adapters and write the canonical CSV tables
    Fetch,
    /// Load (and cache) zone polygons and print a summary
    Zones,
    /// List every available data adapter
    Adapters,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Adapters) {
        println!("{:<14} {:<11} description", "table", "type");
        for adapter in site_scout_source::registry::all_adapters() {
            println!(
                "{:<14} {:<11} {}",
                adapter.table.table_name(),
                adapter.type_name,
                adapter.description
            );
        }
        return Ok(());
    }

    let mut config = Config::load(&cli.config)?;
    let start = Instant::now();

    match cli.command {
        Commands::Score { top_n, output } => {
            if let Some(top_n) = top_n {
                config.top_n = top_n;
            }
            if let Some(output) = output {
                config.output = output;
            }

            let ranking = site_scout_cli::score(&config).await?;

            for warning in &ranking.warnings {
                log::debug!("Incomplete zone: {warning}");
            }
            log::info!(
                "Ranked {} of {} zones in {:.1}s",
                ranking.ranked.len(),
                ranking.scored_zones,
                start.elapsed().as_secs_f64()
            );

            println!("Top {PRINTED_ROWS} block groups by score:");
            print!("{}", format_top(&ranking.ranked, PRINTED_ROWS));
            println!("Report written to {}", config.output.display());
        }
        Commands::Fetch => {
            let written = site_scout_cli::fetch(&config).await?;
            for path in &written {
                println!("{}", path.display());
            }
            log::info!(
                "Fetched {} tables in {:.1}s",
                written.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Zones => {
            let zones = site_scout_cli::load_zones(&config).await?;
            println!("{} zones", zones.len());
            if let Some([min_x, min_y, max_x, max_y]) = site_scout_zone::zone_bounds(&zones) {
                println!("Bounds: ({min_x:.5}, {min_y:.5}) - ({max_x:.5}, {max_y:.5})");
            }

            let mut regions = std::collections::BTreeMap::<&str, usize>::new();
            for zone in &zones {
                *regions.entry(zone.region_code.as_str()).or_default() += 1;
            }
            for (region, count) in regions {
                println!("  {region}: {count}");
            }
        }
        Commands::Adapters => {}
    }

    Ok(())
}
