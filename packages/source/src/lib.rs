#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical data adapters.
//!
//! Each of the three canonical tables (competitors, demographics, foot
//! traffic) can be produced by a small, closed set of adapter
//! implementations selected from configuration. Every adapter returns the
//! canonical record types from [`site_scout_source_models`]; nothing
//! downstream knows where the data came from.

pub mod census;
pub mod csv_table;
pub mod overpass;
pub mod registry;
pub mod retry;

use std::path::{Path, PathBuf};

use site_scout_source_models::{
    CompetitorAdapter, CompetitorRecord, DemographicRecord, DemographicsAdapter,
    FootTrafficAdapter, FootTrafficRecord, SourcesConfig, TableKind,
};

/// User-Agent sent to every remote data provider.
const USER_AGENT: &str = "SiteScout/1.0 (+https://github.com/BSteffaniak/site-scout)";

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A remote source could not be retrieved.
    #[error("Data unavailable ({source_label}): {message}")]
    DataUnavailable {
        /// Which source failed.
        source_label: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A table is missing required columns or is malformed.
    #[error("Schema error in {table} table: {message}")]
    Schema {
        /// The offending table.
        table: TableKind,
        /// Description of what went wrong.
        message: String,
    },

    /// A required credential is not set in the environment.
    #[error("Missing credential: set {var} in your environment")]
    MissingCredential {
        /// Environment variable name.
        var: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The three canonical tables for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    /// Competitor locations.
    pub competitors: Vec<CompetitorRecord>,
    /// Block group demographics.
    pub demographics: Vec<DemographicRecord>,
    /// Foot-traffic observations.
    pub foot_traffic: Vec<FootTrafficRecord>,
}

/// Builds the HTTP client shared by all remote adapters.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be built.
pub fn build_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Loads the competitor table.
///
/// # Errors
///
/// Returns [`SourceError`] if the adapter fails.
pub async fn load_competitors(
    adapter: &CompetitorAdapter,
    client: &reqwest::Client,
) -> Result<Vec<CompetitorRecord>, SourceError> {
    let records = match adapter {
        CompetitorAdapter::Csv { path } => csv_table::read_competitors(Path::new(path))?,
        CompetitorAdapter::Overpass {
            area,
            tags,
            endpoint,
        } => overpass::fetch_nodes(client, endpoint.as_deref(), area, tags)
            .await?
            .into_iter()
            .map(|node| CompetitorRecord {
                comp_id: node.id,
                latitude: node.lat,
                longitude: node.lon,
            })
            .collect(),
    };

    log::info!(
        "Loaded {} competitor records via {}",
        records.len(),
        registry::competitor_type(adapter)
    );
    Ok(records)
}

/// Loads the demographics table.
///
/// # Errors
///
/// Returns [`SourceError`] if the adapter fails.
pub async fn load_demographics(
    adapter: &DemographicsAdapter,
    client: &reqwest::Client,
) -> Result<Vec<DemographicRecord>, SourceError> {
    let records = match adapter {
        DemographicsAdapter::Csv { path } => csv_table::read_demographics(Path::new(path))?,
        DemographicsAdapter::CensusAcs {
            year,
            state_fips,
            county_fips,
            api_key_env,
        } => {
            let api_key =
                std::env::var(api_key_env).map_err(|_| SourceError::MissingCredential {
                    var: api_key_env.clone(),
                })?;
            census::fetch_block_groups(client, *year, state_fips, county_fips, &api_key).await?
        }
    };

    log::info!(
        "Loaded {} demographic records via {}",
        records.len(),
        registry::demographics_type(adapter)
    );
    Ok(records)
}

/// Loads the foot-traffic table.
///
/// # Errors
///
/// Returns [`SourceError`] if the adapter fails.
pub async fn load_foot_traffic(
    adapter: &FootTrafficAdapter,
    client: &reqwest::Client,
) -> Result<Vec<FootTrafficRecord>, SourceError> {
    let records = match adapter {
        FootTrafficAdapter::Csv { path } => csv_table::read_foot_traffic(Path::new(path))?,
        FootTrafficAdapter::Overpass {
            area,
            tags,
            week_start,
            endpoint,
        } => overpass::fetch_nodes(client, endpoint.as_deref(), area, tags)
            .await?
            .into_iter()
            .map(|node| FootTrafficRecord {
                site_id: node.id,
                latitude: node.lat,
                longitude: node.lon,
                week_start: Some(*week_start),
                visitor_count: 1,
            })
            .collect(),
    };

    log::info!(
        "Loaded {} foot-traffic records via {}",
        records.len(),
        registry::foot_traffic_type(adapter)
    );
    Ok(records)
}

/// Loads all three tables concurrently.
///
/// # Errors
///
/// Returns the first [`SourceError`] any adapter produces.
pub async fn load_all(sources: &SourcesConfig) -> Result<Tables, SourceError> {
    let client = build_client()?;

    let (foot_traffic, demographics, competitors) = tokio::try_join!(
        load_foot_traffic(&sources.foot_traffic, &client),
        load_demographics(&sources.demographics, &client),
        load_competitors(&sources.competitors, &client),
    )?;

    Ok(Tables {
        competitors,
        demographics,
        foot_traffic,
    })
}

/// Writes the three tables as canonical CSVs under `dir`, returning the
/// written paths.
///
/// # Errors
///
/// Returns [`SourceError`] if a file can't be written.
pub fn persist(tables: &Tables, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(TableKind::ALL.len());
    for kind in TableKind::ALL {
        let path = dir.join(format!("{}.csv", kind.table_name()));
        match kind {
            TableKind::Competitors => csv_table::write_records(&path, &tables.competitors)?,
            TableKind::Demographics => csv_table::write_records(&path, &tables.demographics)?,
            TableKind::FootTraffic => csv_table::write_records(&path, &tables.foot_traffic)?,
        }
        log::info!("Wrote {kind} table to {}", path.display());
        written.push(path);
    }

    Ok(written)
}
