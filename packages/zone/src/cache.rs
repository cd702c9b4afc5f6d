//! On-disk cache for raw zone geometry downloads.
//!
//! A cached artifact is reused iff it already exists; the download future
//! is only awaited on a cache miss.

use std::future::Future;
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::ZoneError;

/// Cache file name for a `TIGERweb` county query.
#[must_use]
pub fn tigerweb_cache_name(layer: u32, state_fips: &str, county_fips: &str) -> String {
    format!("tigerweb_{layer}_{state_fips}{county_fips}.geojson")
}

/// Cache file name for an arbitrary `GeoJSON` URL.
#[must_use]
pub fn url_cache_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("geojson_{}.geojson", &hex::encode(digest)[..16])
}

/// Returns the cached contents at `path`, or awaits `fetch` and stores its
/// result there.
///
/// The file is written to a temporary sibling and renamed into place so an
/// interrupted download never leaves a truncated cache entry behind.
///
/// # Errors
///
/// Returns the error from `fetch`, or [`ZoneError::Io`] if the cache can't
/// be read or written.
pub async fn read_or_fetch<F>(path: &Path, fetch: F) -> Result<String, ZoneError>
where
    F: Future<Output = Result<String, ZoneError>>,
{
    if path.exists() {
        log::info!("Using cached zone geometry at {}", path.display());
        return Ok(std::fs::read_to_string(path)?);
    }

    log::info!(
        "No cached zone geometry at {}, downloading...",
        path.display()
    );
    let body = fetch.await?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("geojson.partial");
    std::fs::write(&tmp, &body)?;
    std::fs::rename(&tmp, path)?;

    log::info!("Cached {} bytes at {}", body.len(), path.display());

    Ok(body)
}
