//! Ranking and the ranked report artifact.

use std::io::Write;
use std::path::Path;

use site_scout_scoring_models::ScoredZone;

use crate::ScoreError;

/// Sorts zones by score descending, breaking ties by ascending zone id,
/// and keeps the first `top_n`.
///
/// A `top_n` larger than the number of zones returns every zone.
#[must_use]
pub fn rank(mut zones: Vec<ScoredZone>, top_n: usize) -> Vec<ScoredZone> {
    zones.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.block_group_id.cmp(&b.block_group_id))
    });
    zones.truncate(top_n);
    zones
}

/// Writes ranked zones as CSV to any writer.
///
/// # Errors
///
/// Returns [`ScoreError::Csv`] if serialization or writing fails.
pub fn write_report_to<W: Write>(writer: W, zones: &[ScoredZone]) -> Result<(), ScoreError> {
    let mut csv = csv::Writer::from_writer(writer);
    for zone in zones {
        csv.serialize(zone)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the ranked report to `path`.
///
/// The report is written to a sibling temp file and renamed into place, so
/// a failure never leaves a partial report behind.
///
/// # Errors
///
/// Returns [`ScoreError`] if the directory or file can't be written.
pub fn write_report(path: &Path, zones: &[ScoredZone]) -> Result<(), ScoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.partial");
    let result = std::fs::File::create(&tmp)
        .map_err(ScoreError::from)
        .and_then(|file| write_report_to(std::io::BufWriter::new(file), zones));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path)?;
    log::info!("Wrote {} ranked zones to {}", zones.len(), path.display());
    Ok(())
}
