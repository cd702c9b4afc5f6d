#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Retail site scoring toolchain.
//!
//! Loads zone polygons and the three canonical tables described by a
//! [`config::Config`], joins points to zones, scores and ranks the zones,
//! and writes the ranked report. Network I/O happens only while loading;
//! [`pipeline`] is the synchronous core.

pub mod config;
pub mod pipeline;

use std::path::PathBuf;

use site_scout_scoring::ScoreError;
use site_scout_source::{SourceError, Tables};
use site_scout_zone::ZoneError;
use site_scout_zone_models::Zone;

use crate::config::{Config, ConfigError};
use crate::pipeline::Ranking;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Zone polygons could not be loaded.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// A canonical table could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Scoring or report output failed.
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Loads the configured zones, restricted to the configured regions.
///
/// # Errors
///
/// Returns [`CliError::Zone`] if the geometry can't be loaded.
pub async fn load_zones(config: &Config) -> Result<Vec<Zone>, CliError> {
    Ok(site_scout_zone::load_zones(&config.zones, &config.region, &config.cache_dir).await?)
}

/// Loads zones and all three tables concurrently.
///
/// # Errors
///
/// Returns the first [`CliError`] from any loader.
pub async fn load_inputs(config: &Config) -> Result<(Vec<Zone>, Tables), CliError> {
    tokio::try_join!(load_zones(config), async {
        Ok::<_, CliError>(site_scout_source::load_all(&config.sources).await?)
    })
}

/// Runs the configured adapters and writes the canonical CSV tables to
/// `processed_dir`.
///
/// # Errors
///
/// Returns [`CliError::Source`] if an adapter fails or a file can't be
/// written.
pub async fn fetch(config: &Config) -> Result<Vec<PathBuf>, CliError> {
    let tables = site_scout_source::load_all(&config.sources).await?;
    Ok(site_scout_source::persist(&tables, &config.processed_dir)?)
}

/// Full run: load inputs, score, rank, and write the report.
///
/// Configuration is re-validated before any data is loaded, and nothing is
/// written unless every step succeeds.
///
/// # Errors
///
/// Returns [`CliError`] for invalid configuration, unavailable data,
/// schema errors, or a failed report write.
pub async fn score(config: &Config) -> Result<Ranking, CliError> {
    config.validate()?;

    let (zones, tables) = load_inputs(config).await?;

    let ranking = pipeline::rank_zones(
        &zones,
        &tables,
        &config.weights,
        &config.scoring,
        config.top_n,
    )?;

    site_scout_scoring::write_report(&config.output, &ranking.ranked)?;
    Ok(ranking)
}
