#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone (census block group) polygon types.
//!
//! A [`Zone`] is the geographic unit every point dataset is aggregated
//! into. Zones are loaded from a [`ZoneSourceConfig`] and restricted to a
//! set of region codes by the zone registry.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Default `TIGERweb` layer for census block groups.
pub const DEFAULT_TIGERWEB_LAYER: u32 = 10;

/// A polygon-bounded geographic unit.
///
/// Coordinates are longitude/latitude degrees (WGS84), matching the point
/// data produced by the source adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Stable zone identifier (block group GEOID, e.g. `"484530001011"`).
    pub id: String,
    /// Administrative region code used for filtering (state + county FIPS,
    /// e.g. `"48453"`).
    pub region_code: String,
    /// Zone boundary.
    pub geometry: MultiPolygon<f64>,
}

/// Where zone polygons come from, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneSourceConfig {
    /// A local `GeoJSON` `FeatureCollection`.
    GeojsonFile {
        /// Path to the `.geojson` file.
        path: String,
        /// Property mapping.
        #[serde(default)]
        fields: ZoneFieldMapping,
    },
    /// A remote `GeoJSON` `FeatureCollection`, cached on first download.
    GeojsonUrl {
        /// Full URL returning a `FeatureCollection`.
        url: String,
        /// Property mapping.
        #[serde(default)]
        fields: ZoneFieldMapping,
    },
    /// Census Bureau `TIGERweb` `MapServer` query for one county.
    Tigerweb {
        /// Two-digit state FIPS code (e.g. `"48"`).
        state_fips: String,
        /// Three-digit county FIPS code (e.g. `"453"`).
        county_fips: String,
        /// `MapServer` layer (default: block groups).
        #[serde(default = "default_tigerweb_layer")]
        layer: u32,
    },
}

const fn default_tigerweb_layer() -> u32 {
    DEFAULT_TIGERWEB_LAYER
}

impl ZoneSourceConfig {
    /// Property mapping for this source. `TIGERweb` always uses the
    /// default `GEOID` mapping.
    #[must_use]
    pub fn fields(&self) -> ZoneFieldMapping {
        match self {
            Self::GeojsonFile { fields, .. } | Self::GeojsonUrl { fields, .. } => fields.clone(),
            Self::Tigerweb { .. } => ZoneFieldMapping::default(),
        }
    }

    /// Short human-readable label for log messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::GeojsonFile { path, .. } => format!("zones from {path}"),
            Self::GeojsonUrl { url, .. } => format!("zones from {url}"),
            Self::Tigerweb {
                state_fips,
                county_fips,
                layer,
            } => format!("TIGERweb layer {layer} for county {state_fips}{county_fips}"),
        }
    }
}

/// Which feature properties hold the zone id and region code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFieldMapping {
    /// Property containing the zone identifier.
    #[serde(default = "default_id_field")]
    pub id: String,
    /// Property containing the region code. When unset, the region code is
    /// derived from the zone id (first five characters).
    #[serde(default)]
    pub region: Option<String>,
}

fn default_id_field() -> String {
    "GEOID".to_string()
}

impl Default for ZoneFieldMapping {
    fn default() -> Self {
        Self {
            id: default_id_field(),
            region: None,
        }
    }
}

/// Set of region codes zones must belong to. An empty filter keeps every
/// zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFilter {
    /// Accepted region codes (e.g. `["48453"]`).
    #[serde(default)]
    pub codes: Vec<String>,
}

impl RegionFilter {
    /// Whether a zone with this region code passes the filter.
    #[must_use]
    pub fn accepts(&self, region_code: &str) -> bool {
        self.codes.is_empty() || self.codes.iter().any(|c| c == region_code)
    }
}

/// Derive the county GEOID (state + county FIPS) from a block group or
/// tract GEOID (first 5 characters).
#[must_use]
pub fn derive_county_geoid(geoid: &str) -> Option<&str> {
    geoid.get(..5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = RegionFilter::default();
        assert!(filter.accepts("48453"));
        assert!(filter.accepts(""));
    }

    #[test]
    fn filter_matches_listed_codes_only() {
        let filter = RegionFilter {
            codes: vec!["48453".to_string(), "48491".to_string()],
        };
        assert!(filter.accepts("48491"));
        assert!(!filter.accepts("48201"));
    }

    #[test]
    fn derives_county_from_block_group() {
        assert_eq!(derive_county_geoid("484530001011"), Some("48453"));
        assert_eq!(derive_county_geoid("484"), None);
    }

    #[test]
    fn parses_tagged_zone_sources() {
        #[derive(Deserialize)]
        struct Wrapper {
            zones: ZoneSourceConfig,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [zones]
            type = "tigerweb"
            state_fips = "48"
            county_fips = "453"
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.zones,
            ZoneSourceConfig::Tigerweb {
                state_fips: "48".to_string(),
                county_fips: "453".to_string(),
                layer: DEFAULT_TIGERWEB_LAYER,
            }
        );

        let parsed: Wrapper = toml::from_str(
            r#"
            [zones]
            type = "geojson_file"
            path = "zones.geojson"
            [zones.fields]
            id = "zone_id"
            region = "region_code"
            "#,
        )
        .unwrap();
        let fields = parsed.zones.fields();
        assert_eq!(fields.id, "zone_id");
        assert_eq!(fields.region.as_deref(), Some("region_code"));
    }

    #[test]
    fn rejects_unknown_zone_source_type() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrapper {
            zones: ZoneSourceConfig,
        }

        let result: Result<Wrapper, _> = toml::from_str(
            r#"
            [zones]
            type = "shapefile"
            path = "bg.shp"
            "#,
        );
        assert!(result.is_err());
    }
}
