#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical table records and adapter configuration.
//!
//! Every data adapter, regardless of where its data comes from, produces
//! one of the three canonical record types defined here. Serialized field
//! names are the canonical column names.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default environment variable holding the Census API key.
pub const DEFAULT_CENSUS_API_KEY_ENV: &str = "CENSUS_API_KEY";

/// A geolocated observation that can be assigned to a zone.
pub trait Located {
    /// Identifier of the record within its source.
    fn point_id(&self) -> &str;

    /// Latitude in WGS84 degrees.
    fn latitude(&self) -> f64;

    /// Longitude in WGS84 degrees.
    fn longitude(&self) -> f64;
}

/// A competitor location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    /// Source-unique competitor id (e.g. OSM node id).
    pub comp_id: String,
    /// Latitude in WGS84 degrees. NaN when the source value was unusable.
    pub latitude: f64,
    /// Longitude in WGS84 degrees. NaN when the source value was unusable.
    pub longitude: f64,
}

impl Located for CompetitorRecord {
    fn point_id(&self) -> &str {
        &self.comp_id
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Demographic attributes for one block group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    /// Block group GEOID (state + county + tract + block group).
    pub block_group_id: String,
    /// Total population (ACS `B01003_001E`). `None` when suppressed or
    /// unparseable.
    pub population: Option<u64>,
    /// Median household income (ACS `B19013_001E`). `None` when
    /// suppressed or unparseable.
    pub median_income: Option<f64>,
}

/// A foot-traffic observation at a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootTrafficRecord {
    /// Source-unique site id.
    pub site_id: String,
    /// Latitude in WGS84 degrees. NaN when the source value was unusable.
    pub latitude: f64,
    /// Longitude in WGS84 degrees. NaN when the source value was unusable.
    pub longitude: f64,
    /// Week the observation belongs to.
    pub week_start: Option<NaiveDate>,
    /// Visits recorded for this site (currently always 1 per record).
    pub visitor_count: u32,
}

impl Located for FootTrafficRecord {
    fn point_id(&self) -> &str {
        &self.site_id
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// The three canonical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKind {
    /// Competitor locations.
    Competitors,
    /// Block group demographics.
    Demographics,
    /// Foot-traffic observations.
    FootTraffic,
}

impl TableKind {
    /// All table kinds, in pipeline order.
    pub const ALL: &[Self] = &[Self::FootTraffic, Self::Demographics, Self::Competitors];

    /// Canonical table name (also the persisted CSV stem).
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Competitors => "competitors",
            Self::Demographics => "demographics",
            Self::FootTraffic => "foot_traffic",
        }
    }

    /// Columns every adapter for this table must provide.
    #[must_use]
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Competitors => &["comp_id", "latitude", "longitude"],
            Self::Demographics => &["block_group_id", "population", "median_income"],
            Self::FootTraffic => &[
                "site_id",
                "latitude",
                "longitude",
                "week_start",
                "visitor_count",
            ],
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// OSM tag filter: tag key -> value, where `"*"` matches any value.
pub type TagFilter = BTreeMap<String, String>;

/// Competitor adapters, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompetitorAdapter {
    /// Canonical CSV file.
    Csv {
        /// Path to the CSV file.
        path: String,
    },
    /// `OpenStreetMap` nodes via the Overpass API.
    Overpass {
        /// Administrative area name (e.g. `"Austin"`).
        area: String,
        /// Tags selecting competitor nodes (e.g. `shop = "*"`).
        tags: TagFilter,
        /// Overpass interpreter URL override.
        #[serde(default)]
        endpoint: Option<String>,
    },
}

/// Demographics adapters, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DemographicsAdapter {
    /// Canonical CSV file.
    Csv {
        /// Path to the CSV file.
        path: String,
    },
    /// Census Bureau ACS 5-year estimates at block group level.
    CensusAcs {
        /// ACS vintage (e.g. `2021`).
        year: u16,
        /// Two-digit state FIPS code.
        state_fips: String,
        /// Three-digit county FIPS code.
        county_fips: String,
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
}

fn default_api_key_env() -> String {
    DEFAULT_CENSUS_API_KEY_ENV.to_string()
}

/// Foot-traffic adapters, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FootTrafficAdapter {
    /// Canonical CSV file.
    Csv {
        /// Path to the CSV file.
        path: String,
    },
    /// `OpenStreetMap` points of interest as a proxy for visits, one visit
    /// per POI.
    Overpass {
        /// Administrative area name (e.g. `"Austin"`).
        area: String,
        /// Tags selecting POI nodes (e.g. `amenity = "restaurant"`).
        tags: TagFilter,
        /// Week stamped onto every record.
        week_start: NaiveDate,
        /// Overpass interpreter URL override.
        #[serde(default)]
        endpoint: Option<String>,
    },
}

/// Which adapter implementation to use for each table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Competitor adapter.
    pub competitors: CompetitorAdapter,
    /// Demographics adapter.
    pub demographics: DemographicsAdapter,
    /// Foot-traffic adapter.
    pub foot_traffic: FootTrafficAdapter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_adapter_selection() {
        let sources: SourcesConfig = toml::from_str(
            r#"
            [competitors]
            type = "overpass"
            area = "Austin"
            tags = { shop = "*" }

            [demographics]
            type = "census_acs"
            year = 2021
            state_fips = "48"
            county_fips = "453"

            [foot_traffic]
            type = "csv"
            path = "data/processed/foot_traffic.csv"
            "#,
        )
        .unwrap();

        assert!(matches!(
            sources.competitors,
            CompetitorAdapter::Overpass { ref tags, .. } if tags.get("shop").map(String::as_str) == Some("*")
        ));
        assert!(matches!(
            sources.demographics,
            DemographicsAdapter::CensusAcs { ref api_key_env, year: 2021, .. }
                if api_key_env == DEFAULT_CENSUS_API_KEY_ENV
        ));
        assert!(matches!(sources.foot_traffic, FootTrafficAdapter::Csv { .. }));
    }

    #[test]
    fn rejects_adapters_outside_the_registry() {
        let result: Result<SourcesConfig, _> = toml::from_str(
            r#"
            [competitors]
            type = "connectors.competitors.OSMCompetitorAdapter"

            [demographics]
            type = "csv"
            path = "d.csv"

            [foot_traffic]
            type = "csv"
            path = "f.csv"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn located_exposes_coordinates() {
        let comp = CompetitorRecord {
            comp_id: "n1".to_string(),
            latitude: 30.27,
            longitude: -97.74,
        };
        assert_eq!(comp.point_id(), "n1");
        assert!((Located::latitude(&comp) - 30.27).abs() < f64::EPSILON);
        assert!((Located::longitude(&comp) - -97.74).abs() < f64::EPSILON);
    }

    #[test]
    fn table_names_are_canonical() {
        assert_eq!(TableKind::FootTraffic.to_string(), "foot_traffic");
        assert_eq!(
            TableKind::Demographics.required_columns(),
            &["block_group_id", "population", "median_income"]
        );
    }
}
