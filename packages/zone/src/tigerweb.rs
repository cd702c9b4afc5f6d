//! Block group polygons from the Census Bureau `TIGERweb` REST API.
//!
//! Queries one county at a time as `GeoJSON` in EPSG:4326 and assembles
//! the paginated responses into a single `FeatureCollection` document
//! suitable for caching.

use site_scout_source::retry;

use crate::ZoneError;

/// Page size for `TIGERweb` paginated requests. Kept low to avoid WAF
/// blocks on large geospatial responses.
const TIGERWEB_PAGE_SIZE: u32 = 100;

/// Browser-like User-Agent to avoid WAF blocks on `TIGERweb`.
const TIGERWEB_USER_AGENT: &str = "Mozilla/5.0 (compatible; SiteScout/1.0; +https://github.com)";

/// Builds the county query URL (without pagination parameters).
#[must_use]
pub fn county_query_url(layer: u32, state_fips: &str, county_fips: &str) -> String {
    format!(
        "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2023/MapServer/{layer}/query\
         ?where=STATE%3D%27{state_fips}%27%20AND%20COUNTY%3D%27{county_fips}%27\
         &outFields=GEOID,STATE,COUNTY\
         &outSR=4326\
         &f=geojson\
         &returnGeometry=true"
    )
}

/// Fetches every feature for one county and returns them as a
/// `FeatureCollection` JSON string.
///
/// Pages are requested with `resultOffset` + `resultRecordCount` while the
/// server reports `exceededTransferLimit`. Each page goes through the
/// shared retry helper.
///
/// # Errors
///
/// Returns [`ZoneError::DataUnavailable`] if any page fails after all retry
/// attempts or isn't a usable `TIGERweb` response.
pub async fn fetch_county(
    layer: u32,
    state_fips: &str,
    county_fips: &str,
    label: &str,
) -> Result<String, ZoneError> {
    let client = reqwest::Client::builder()
        .user_agent(TIGERWEB_USER_AGENT)
        .build()
        .map_err(|e| unavailable(label, format!("failed to build HTTP client: {e}")))?;

    let base_url = county_query_url(layer, state_fips, county_fips);
    let mut features = Vec::new();

    loop {
        let url = format!(
            "{base_url}&resultRecordCount={TIGERWEB_PAGE_SIZE}&resultOffset={}",
            features.len()
        );
        let body = retry::send_text(label, || client.get(&url))
            .await
            .map_err(|e| unavailable(label, e.to_string()))?;

        let page = parse_page(&body, label)?;
        let more = page.exceeded_transfer_limit && !page.features.is_empty();
        features.extend(page.features);

        if !more {
            break;
        }
        log::debug!("{label}: {} features so far, requesting next page", features.len());
    }

    log::info!("{label}: fetched {} features", features.len());

    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    });

    Ok(collection.to_string())
}

/// One page of a `TIGERweb` query.
#[derive(Debug)]
pub struct Page {
    /// Features on this page.
    pub features: Vec<serde_json::Value>,
    /// Whether the server has more features past this page.
    pub exceeded_transfer_limit: bool,
}

/// Parses a `TIGERweb` page, surfacing `ArcGIS` error envelopes.
///
/// # Errors
///
/// Returns [`ZoneError::DataUnavailable`] for invalid JSON, an
/// `{"error": {...}}` envelope, or a response without a `features` array.
pub fn parse_page(body: &str, label: &str) -> Result<Page, ZoneError> {
    let mut json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| unavailable(label, format!("invalid JSON from TIGERweb: {e}")))?;

    if let Some(error) = json.get("error") {
        let code = error.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        return Err(unavailable(label, format!("ArcGIS error {code}: {message}")));
    }

    let exceeded_transfer_limit = json
        .get("exceededTransferLimit")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    match json.get_mut("features").map(serde_json::Value::take) {
        Some(serde_json::Value::Array(features)) => Ok(Page {
            features,
            exceeded_transfer_limit,
        }),
        _ => Err(unavailable(
            label,
            "no features array in TIGERweb response".to_string(),
        )),
    }
}

fn unavailable(label: &str, message: String) -> ZoneError {
    ZoneError::DataUnavailable {
        source_label: label.to_string(),
        message,
    }
}
