#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone registry.
//!
//! Loads block group polygons from a local `GeoJSON` file, a remote
//! `GeoJSON` URL, or the Census Bureau `TIGERweb` REST API, normalizes
//! their coordinates to longitude/latitude, and restricts them to the
//! configured region codes. Remote geometry is cached on disk so repeated
//! runs only download once.

pub mod cache;
pub mod features;
pub mod tigerweb;

use std::path::Path;

use geo::BoundingRect as _;
use site_scout_zone_models::{RegionFilter, Zone, ZoneSourceConfig};
use thiserror::Error;

/// Errors that can occur while loading zones.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The geometry source could not be retrieved.
    #[error("Zone geometry unavailable ({source_label}): {message}")]
    DataUnavailable {
        /// Which zone source failed.
        source_label: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The geometry source is missing required fields or is malformed.
    #[error("Schema error in {table}: {message}")]
    Schema {
        /// Name of the offending table/source.
        table: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The `GeoJSON` declares a coordinate reference system we can't
    /// convert to longitude/latitude.
    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    /// Two features share the same zone identifier.
    #[error("Duplicate zone id: {0}")]
    DuplicateZone(String),

    /// I/O error (cache read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads zones from `source`, keeping only those accepted by `filter`.
///
/// Remote sources are cached under `cache_dir` and reused on later runs.
///
/// # Errors
///
/// * [`ZoneError::DataUnavailable`] if the geometry can't be read or
///   downloaded
/// * [`ZoneError::Schema`] if features lack the id/region properties
/// * [`ZoneError::UnsupportedCrs`] / [`ZoneError::DuplicateZone`] for
///   unusable geometry collections
pub async fn load_zones(
    source: &ZoneSourceConfig,
    filter: &RegionFilter,
    cache_dir: &Path,
) -> Result<Vec<Zone>, ZoneError> {
    let label = source.label();
    log::info!("Loading {label}...");

    let raw = match source {
        ZoneSourceConfig::GeojsonFile { path, .. } => {
            std::fs::read_to_string(path).map_err(|e| ZoneError::DataUnavailable {
                source_label: label.clone(),
                message: format!("failed to read {path}: {e}"),
            })?
        }
        ZoneSourceConfig::GeojsonUrl { url, .. } => {
            let cache_path = cache_dir.join(cache::url_cache_name(url));
            cache::read_or_fetch(&cache_path, download_geojson(url, &label)).await?
        }
        ZoneSourceConfig::Tigerweb {
            state_fips,
            county_fips,
            layer,
        } => {
            let cache_path = cache_dir.join(cache::tigerweb_cache_name(
                *layer,
                state_fips,
                county_fips,
            ));
            cache::read_or_fetch(
                &cache_path,
                tigerweb::fetch_county(*layer, state_fips, county_fips, &label),
            )
            .await?
        }
    };

    let zones = features::parse_zones(&raw, &source.fields(), &label)?;
    let total = zones.len();
    let zones = filter_zones(zones, filter);

    log::info!(
        "Loaded {} zones ({} outside region filter dropped)",
        zones.len(),
        total - zones.len()
    );
    if let Some(bounds) = zone_bounds(&zones) {
        log::info!(
            "Zone bounds: ({:.5}, {:.5}) - ({:.5}, {:.5})",
            bounds[0],
            bounds[1],
            bounds[2],
            bounds[3]
        );
    }

    Ok(zones)
}

/// Keeps only the zones whose region code passes `filter`.
#[must_use]
pub fn filter_zones(zones: Vec<Zone>, filter: &RegionFilter) -> Vec<Zone> {
    zones
        .into_iter()
        .filter(|zone| filter.accepts(&zone.region_code))
        .collect()
}

/// Overall `[min_lng, min_lat, max_lng, max_lat]` of a set of zones.
#[must_use]
pub fn zone_bounds(zones: &[Zone]) -> Option<[f64; 4]> {
    zones
        .iter()
        .filter_map(|zone| zone.geometry.bounding_rect())
        .map(|rect| [rect.min().x, rect.min().y, rect.max().x, rect.max().y])
        .reduce(|a, b| {
            [
                a[0].min(b[0]),
                a[1].min(b[1]),
                a[2].max(b[2]),
                a[3].max(b[3]),
            ]
        })
}

/// Downloads a `GeoJSON` document as text.
async fn download_geojson(url: &str, label: &str) -> Result<String, ZoneError> {
    let client = site_scout_source::build_client().map_err(|e| unavailable(label, &e))?;
    site_scout_source::retry::send_text(label, || client.get(url))
        .await
        .map_err(|e| unavailable(label, &e))
}

fn unavailable(label: &str, error: &site_scout_source::SourceError) -> ZoneError {
    ZoneError::DataUnavailable {
        source_label: label.to_string(),
        message: error.to_string(),
    }
}
