//! Block group demographics from the Census Bureau ACS 5-year API.
//!
//! Requests total population (`B01003_001E`) and median household income
//! (`B19013_001E`) for every block group in one county.

use site_scout_source_models::{DemographicRecord, TableKind};

use crate::csv_table::sanitize_income;
use crate::{SourceError, retry};

/// ACS variable for total population.
const POPULATION_VAR: &str = "B01003_001E";

/// ACS variable for median household income.
const MEDIAN_INCOME_VAR: &str = "B19013_001E";

/// Builds the ACS query URL for all block groups in a county.
#[must_use]
pub fn block_group_url(year: u16, state_fips: &str, county_fips: &str, api_key: &str) -> String {
    format!(
        "https://api.census.gov/data/{year}/acs/acs5\
         ?get={POPULATION_VAR},{MEDIAN_INCOME_VAR}\
         &for=block%20group:*\
         &in=state:{state_fips}\
         &in=county:{county_fips}\
         &in=tract:*\
         &key={api_key}"
    )
}

/// Fetches block group demographics for one county.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails or the response doesn't
/// have the expected shape.
pub async fn fetch_block_groups(
    client: &reqwest::Client,
    year: u16,
    state_fips: &str,
    county_fips: &str,
    api_key: &str,
) -> Result<Vec<DemographicRecord>, SourceError> {
    let url = block_group_url(year, state_fips, county_fips, api_key);
    let label = format!("ACS {year} block groups for county {state_fips}{county_fips}");
    log::info!("Fetching {label}...");

    let body = retry::send_text(&label, || client.get(&url)).await?;
    parse_block_groups(&body)
}

/// Parses an ACS response into demographic records.
///
/// The response is a JSON array of arrays whose first row is the header:
///
/// ```text
/// [["B01003_001E","B19013_001E","state","county","tract","block group"],
///  ["1181","61250","48","453","000101","1"], ...]
/// ```
///
/// Values may be `null` or negative suppression sentinels; both become
/// missing.
///
/// # Errors
///
/// Returns [`SourceError::Json`] for invalid JSON and
/// [`SourceError::Schema`] if a required column is absent.
pub fn parse_block_groups(body: &str) -> Result<Vec<DemographicRecord>, SourceError> {
    let rows: Vec<Vec<Option<String>>> = serde_json::from_str(body)?;

    let Some((header, data)) = rows.split_first() else {
        return Err(SourceError::Schema {
            table: TableKind::Demographics,
            message: "empty ACS response".to_string(),
        });
    };

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.as_deref() == Some(name))
            .ok_or_else(|| SourceError::Schema {
                table: TableKind::Demographics,
                message: format!("ACS response has no '{name}' column"),
            })
    };

    let pop_idx = column(POPULATION_VAR)?;
    let income_idx = column(MEDIAN_INCOME_VAR)?;
    let id_idx = [
        column("state")?,
        column("county")?,
        column("tract")?,
        column("block group")?,
    ];

    let mut records = Vec::with_capacity(data.len());
    for row in data {
        // GEOID = state + county + tract + block group
        let Some(block_group_id) = id_idx
            .iter()
            .map(|&idx| cell(row, idx))
            .collect::<Option<String>>()
        else {
            log::warn!("Skipping ACS row without a complete GEOID: {row:?}");
            continue;
        };

        let population = cell(row, pop_idx)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|p| u64::try_from(p).ok());
        let median_income = cell(row, income_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(sanitize_income);

        records.push(DemographicRecord {
            block_group_id,
            population,
            median_income,
        });
    }

    Ok(records)
}

fn cell(row: &[Option<String>], idx: usize) -> Option<String> {
    row.get(idx).cloned().flatten()
}
