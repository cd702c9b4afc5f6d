//! Closed registry of adapter implementations.
//!
//! Adapters are selected from configuration through the tagged enums in
//! [`site_scout_source_models`]; this table lists every
//! `(table, type)` pair those enums accept so the CLI can describe them.
//! Adding an adapter means adding an enum variant and an entry here.

use site_scout_source_models::{
    CompetitorAdapter, DemographicsAdapter, FootTrafficAdapter, TableKind,
};

/// Description of one adapter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Table the adapter produces.
    pub table: TableKind,
    /// Value of the `type` key selecting this adapter.
    pub type_name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

/// Number of registered adapters. Enforced by a test.
#[cfg(test)]
const EXPECTED_ADAPTER_COUNT: usize = 6;

const ADAPTERS: &[AdapterInfo] = &[
    AdapterInfo {
        table: TableKind::FootTraffic,
        type_name: "csv",
        description: "Canonical foot-traffic CSV file",
    },
    AdapterInfo {
        table: TableKind::FootTraffic,
        type_name: "overpass",
        description: "OpenStreetMap POI nodes via Overpass, one visit per POI",
    },
    AdapterInfo {
        table: TableKind::Demographics,
        type_name: "csv",
        description: "Canonical demographics CSV file",
    },
    AdapterInfo {
        table: TableKind::Demographics,
        type_name: "census_acs",
        description: "Census ACS 5-year block group population and median income",
    },
    AdapterInfo {
        table: TableKind::Competitors,
        type_name: "csv",
        description: "Canonical competitors CSV file",
    },
    AdapterInfo {
        table: TableKind::Competitors,
        type_name: "overpass",
        description: "OpenStreetMap competitor nodes via Overpass",
    },
];

/// Returns every registered adapter.
#[must_use]
pub const fn all_adapters() -> &'static [AdapterInfo] {
    ADAPTERS
}

/// Looks up a registered adapter by table and `type` value.
#[must_use]
pub fn find(table: TableKind, type_name: &str) -> Option<&'static AdapterInfo> {
    ADAPTERS
        .iter()
        .find(|a| a.table == table && a.type_name == type_name)
}

/// `type` value of a competitor adapter.
#[must_use]
pub const fn competitor_type(adapter: &CompetitorAdapter) -> &'static str {
    match adapter {
        CompetitorAdapter::Csv { .. } => "csv",
        CompetitorAdapter::Overpass { .. } => "overpass",
    }
}

/// `type` value of a demographics adapter.
#[must_use]
pub const fn demographics_type(adapter: &DemographicsAdapter) -> &'static str {
    match adapter {
        DemographicsAdapter::Csv { .. } => "csv",
        DemographicsAdapter::CensusAcs { .. } => "census_acs",
    }
}

/// `type` value of a foot-traffic adapter.
#[must_use]
pub const fn foot_traffic_type(adapter: &FootTrafficAdapter) -> &'static str {
    match adapter {
        FootTrafficAdapter::Csv { .. } => "csv",
        FootTrafficAdapter::Overpass { .. } => "overpass",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_scout_source_models::TagFilter;
    use std::collections::BTreeSet;

    fn serialized_type<T: serde::Serialize>(adapter: &T) -> String {
        serde_json::to_value(adapter).unwrap()["type"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn loads_all_adapters() {
        assert_eq!(
            all_adapters().len(),
            EXPECTED_ADAPTER_COUNT,
            "Expected {EXPECTED_ADAPTER_COUNT} adapters. \
             Update EXPECTED_ADAPTER_COUNT after adding/removing adapters."
        );
    }

    #[test]
    fn adapter_keys_are_unique() {
        let mut seen = BTreeSet::new();
        for adapter in all_adapters() {
            assert!(
                seen.insert((adapter.table, adapter.type_name)),
                "Duplicate adapter: {} {}",
                adapter.table,
                adapter.type_name
            );
        }
    }

    #[test]
    fn every_config_variant_is_registered() {
        let competitors = [
            CompetitorAdapter::Csv {
                path: "c.csv".to_string(),
            },
            CompetitorAdapter::Overpass {
                area: "Austin".to_string(),
                tags: TagFilter::new(),
                endpoint: None,
            },
        ];
        for adapter in &competitors {
            let tag = serialized_type(adapter);
            assert_eq!(tag, competitor_type(adapter));
            assert!(find(TableKind::Competitors, &tag).is_some(), "{tag}");
        }

        let demographics = [
            DemographicsAdapter::Csv {
                path: "d.csv".to_string(),
            },
            DemographicsAdapter::CensusAcs {
                year: 2021,
                state_fips: "48".to_string(),
                county_fips: "453".to_string(),
                api_key_env: "CENSUS_API_KEY".to_string(),
            },
        ];
        for adapter in &demographics {
            let tag = serialized_type(adapter);
            assert_eq!(tag, demographics_type(adapter));
            assert!(find(TableKind::Demographics, &tag).is_some(), "{tag}");
        }

        let foot_traffic = [
            FootTrafficAdapter::Csv {
                path: "f.csv".to_string(),
            },
            FootTrafficAdapter::Overpass {
                area: "Austin".to_string(),
                tags: TagFilter::new(),
                week_start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                endpoint: None,
            },
        ];
        for adapter in &foot_traffic {
            let tag = serialized_type(adapter);
            assert_eq!(tag, foot_traffic_type(adapter));
            assert!(find(TableKind::FootTraffic, &tag).is_some(), "{tag}");
        }
    }

    #[test]
    fn unknown_adapters_are_not_found() {
        assert!(find(TableKind::Demographics, "overpass").is_none());
        assert!(find(TableKind::Competitors, "census_acs").is_none());
    }
}
