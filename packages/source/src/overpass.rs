//! `OpenStreetMap` points of interest via the Overpass API.
//!
//! Selects nodes matching any of the configured tags inside a named
//! administrative area. Only nodes are returned; ways and relations have
//! no single point location.

use std::fmt::Write as _;

use site_scout_source_models::TagFilter;

use crate::{SourceError, retry};

/// Public Overpass interpreter used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query timeout in seconds.
const QUERY_TIMEOUT_SECS: u32 = 180;

/// A point of interest returned by Overpass.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmNode {
    /// Node id, prefixed with `node/` so ids stay unique across OSM
    /// element types.
    pub id: String,
    /// Latitude in WGS84 degrees.
    pub lat: f64,
    /// Longitude in WGS84 degrees.
    pub lon: f64,
}

/// Builds an Overpass QL query selecting nodes that match any tag in
/// `tags` inside the administrative area named `area`.
///
/// A tag value of `"*"` matches any value for that key.
#[must_use]
pub fn build_query(area: &str, tags: &TagFilter) -> String {
    let mut query = format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n\
         area[\"name\"=\"{}\"][\"boundary\"=\"administrative\"]->.searchArea;\n(\n",
        escape(area)
    );

    for (key, value) in tags {
        let _ = if value == "*" {
            writeln!(query, "  node[\"{}\"](area.searchArea);", escape(key))
        } else {
            writeln!(
                query,
                "  node[\"{}\"=\"{}\"](area.searchArea);",
                escape(key),
                escape(value)
            )
        };
    }

    query.push_str(");\nout body;\n");
    query
}

/// Runs the query for `area`/`tags` and returns the matching nodes.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails or the response isn't
/// valid Overpass JSON.
pub async fn fetch_nodes(
    client: &reqwest::Client,
    endpoint: Option<&str>,
    area: &str,
    tags: &TagFilter,
) -> Result<Vec<OsmNode>, SourceError> {
    let endpoint = endpoint.unwrap_or(DEFAULT_ENDPOINT);
    let query = build_query(area, tags);
    let label = format!("Overpass nodes in {area}");
    log::info!("Fetching {label} ({} tag filters)...", tags.len());
    log::debug!("Overpass query:\n{query}");

    let body = retry::send_text(&label, || {
        client.post(endpoint).form(&[("data", query.as_str())])
    })
    .await?;

    parse_nodes(&body)
}

/// Extracts nodes with coordinates from an Overpass JSON response.
///
/// Overpass reports query timeouts and memory exhaustion as a `remark`
/// alongside a truncated (often empty) element list, so an error remark
/// fails the load rather than returning partial data.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if the body isn't JSON and
/// [`SourceError::DataUnavailable`] for error remarks or a missing
/// `elements` array.
pub fn parse_nodes(body: &str) -> Result<Vec<OsmNode>, SourceError> {
    let json: serde_json::Value = serde_json::from_str(body)?;

    let unavailable = |message: String| SourceError::DataUnavailable {
        source_label: "Overpass".to_string(),
        message,
    };

    if let Some(remark) = json.get("remark").and_then(serde_json::Value::as_str)
        && remark.contains("error")
    {
        return Err(unavailable(remark.to_string()));
    }

    let Some(elements) = json.get("elements").and_then(serde_json::Value::as_array) else {
        return Err(unavailable("response has no elements array".to_string()));
    };

    Ok(elements
        .iter()
        .filter(|e| e.get("type").and_then(serde_json::Value::as_str) == Some("node"))
        .filter_map(|e| {
            let id = e.get("id").and_then(serde_json::Value::as_i64)?;
            Some(OsmNode {
                id: format!("node/{id}"),
                lat: e.get("lat").and_then(serde_json::Value::as_f64)?,
                lon: e.get("lon").and_then(serde_json::Value::as_f64)?,
            })
        })
        .collect())
}

/// Escapes a string for use inside an Overpass QL double-quoted literal.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
