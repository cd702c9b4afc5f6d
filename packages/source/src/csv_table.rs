//! Canonical CSV tables.
//!
//! Reads and writes the three canonical tables as headered CSV files.
//! Extra columns are ignored; missing canonical columns are a schema
//! error naming the table. Individual cells that can't be parsed don't
//! fail the load: unusable coordinates become NaN (so the spatial
//! aggregator can report them per record) and unusable demographic
//! values become missing.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use site_scout_source_models::{
    CompetitorRecord, DemographicRecord, FootTrafficRecord, TableKind,
};

use crate::SourceError;

#[derive(Debug, Deserialize)]
struct CompetitorRow {
    comp_id: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DemographicRow {
    block_group_id: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    population: Option<i64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    median_income: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FootTrafficRow {
    site_id: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    week_start: Option<NaiveDate>,
    #[serde(deserialize_with = "csv::invalid_option")]
    visitor_count: Option<u32>,
}

/// Reads the competitor table from a CSV file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file can't be opened, lacks canonical
/// columns, or is malformed.
pub fn read_competitors(path: &Path) -> Result<Vec<CompetitorRecord>, SourceError> {
    competitors_from(open(path)?)
}

/// Reads the demographics table from a CSV file.
///
/// Negative values (the Census API's suppression sentinels such as
/// `-666666666`) are treated as missing.
///
/// # Errors
///
/// Returns [`SourceError`] if the file can't be opened, lacks canonical
/// columns, or is malformed.
pub fn read_demographics(path: &Path) -> Result<Vec<DemographicRecord>, SourceError> {
    demographics_from(open(path)?)
}

/// Reads the foot-traffic table from a CSV file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file can't be opened, lacks canonical
/// columns, or is malformed.
pub fn read_foot_traffic(path: &Path) -> Result<Vec<FootTrafficRecord>, SourceError> {
    foot_traffic_from(open(path)?)
}

fn competitors_from<R: Read>(reader: R) -> Result<Vec<CompetitorRecord>, SourceError> {
    let rows: Vec<CompetitorRow> = read_rows(reader, TableKind::Competitors)?;
    Ok(rows
        .into_iter()
        .map(|row| CompetitorRecord {
            comp_id: row.comp_id,
            latitude: row.latitude.unwrap_or(f64::NAN),
            longitude: row.longitude.unwrap_or(f64::NAN),
        })
        .collect())
}

fn demographics_from<R: Read>(reader: R) -> Result<Vec<DemographicRecord>, SourceError> {
    let rows: Vec<DemographicRow> = read_rows(reader, TableKind::Demographics)?;
    Ok(rows
        .into_iter()
        .map(|row| DemographicRecord {
            block_group_id: row.block_group_id.trim().to_string(),
            population: row.population.and_then(|p| u64::try_from(p).ok()),
            median_income: row.median_income.and_then(sanitize_income),
        })
        .collect())
}

fn foot_traffic_from<R: Read>(reader: R) -> Result<Vec<FootTrafficRecord>, SourceError> {
    let rows: Vec<FootTrafficRow> = read_rows(reader, TableKind::FootTraffic)?;
    Ok(rows
        .into_iter()
        .map(|row| FootTrafficRecord {
            site_id: row.site_id,
            latitude: row.latitude.unwrap_or(f64::NAN),
            longitude: row.longitude.unwrap_or(f64::NAN),
            week_start: row.week_start,
            visitor_count: row.visitor_count.unwrap_or(1),
        })
        .collect())
}

/// Writes records as a headered CSV file, replacing any existing file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file can't be written.
pub fn write_records<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<(), SourceError> {
    let tmp = path.with_extension("csv.partial");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Valid incomes are finite and non-negative.
pub(crate) fn sanitize_income(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|e| SourceError::DataUnavailable {
        source_label: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Checks the header row for the table's canonical columns, then
/// deserializes every row.
fn read_rows<R: Read, T: DeserializeOwned>(
    reader: R,
    kind: TableKind,
) -> Result<Vec<T>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = kind
        .required_columns()
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if !missing.is_empty() {
        return Err(SourceError::Schema {
            table: kind,
            message: format!("missing required columns: {}", missing.join(", ")),
        });
    }

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;

    log::debug!("Read {} rows from {kind} table", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitors(csv: &str) -> Result<Vec<CompetitorRecord>, SourceError> {
        competitors_from(csv.as_bytes())
    }

    #[test]
    fn reads_competitors_ignoring_extra_columns() {
        let records = competitors("comp_id,name,latitude,longitude\nc1,Cafe,30.27,-97.74\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].comp_id, "c1");
        assert!((records[0].latitude - 30.27).abs() < 1e-12);
    }

    #[test]
    fn missing_column_names_the_table() {
        let err = competitors("comp_id,lat,lng\nc1,30.27,-97.74\n").unwrap_err();
        match err {
            SourceError::Schema { table, message } => {
                assert_eq!(table, TableKind::Competitors);
                assert!(message.contains("latitude"));
                assert!(message.contains("longitude"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_coordinates_become_nan() {
        let records = competitors("comp_id,latitude,longitude\nc1,north,-97.74\nc2,,\n").unwrap();
        assert!(records[0].latitude.is_nan());
        assert!(!records[0].longitude.is_nan());
        assert!(records[1].latitude.is_nan());
        assert!(records[1].longitude.is_nan());
    }

    #[test]
    fn demographics_treat_sentinels_as_missing() {
        let dir = std::env::temp_dir().join("site_scout_source_demographics_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("demographics.csv");
        std::fs::write(
            &path,
            "block_group_id,population,median_income\n\
             484530001011,1200,55000.0\n\
             484530001012,-666666666,-666666666\n\
             484530001013,,n/a\n",
        )
        .unwrap();

        let records = read_demographics(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].population, Some(1200));
        assert_eq!(records[0].median_income, Some(55000.0));
        assert_eq!(records[1].population, None);
        assert_eq!(records[1].median_income, None);
        assert_eq!(records[2].population, None);
        assert_eq!(records[2].median_income, None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn foot_traffic_defaults_visitor_count() {
        let records = foot_traffic_from(
            "site_id,latitude,longitude,week_start,visitor_count\n\
             s1,30.2,-97.7,2024-01-01,\n\
             s2,,-97.7,not-a-date,3\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(records[0].visitor_count, 1);
        assert_eq!(records[0].week_start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(records[1].latitude.is_nan());
        assert_eq!(records[1].week_start, None);
        assert_eq!(records[1].visitor_count, 3);
    }

    #[test]
    fn demographic_ids_are_trimmed() {
        let records =
            demographics_from("block_group_id,population,median_income\n 48453 ,10,1.5\n".as_bytes())
                .unwrap();
        assert_eq!(records[0].block_group_id, "48453");
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let err = read_competitors(Path::new("/nonexistent/site_scout/competitors.csv"))
            .unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));
    }
}
