#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Opportunity score engine.
//!
//! Joins every registry zone with its demographic row and point counts
//! (missing counts become 0), min-max normalizes each metric across the
//! run, and combines them into a weighted composite score. [`report`]
//! ranks the result and writes the report artifact.

pub mod normalize;
pub mod report;

use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map::Entry;

use site_scout_scoring_models::{
    IncompleteReason, IncompleteZone, IncompleteZonePolicy, ScoredZone, ScoringOptions, WEIGHT_SUM_TOLERANCE,
    Weights,
};
use site_scout_source_models::DemographicRecord;

use crate::normalize::MinMax;

pub use report::{rank, write_report, write_report_to};

/// Errors that can occur while scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// Weights are negative, non-finite, or don't sum to 1.
    #[error("Invalid weights: {message}")]
    InvalidWeights {
        /// Every violated constraint, joined.
        message: String,
    },

    /// Scoring options are out of range.
    #[error("Invalid scoring options: {message}")]
    InvalidOptions {
        /// Description of what went wrong.
        message: String,
    },

    /// The demographic table lists a zone more than once.
    #[error("Duplicate zone in demographics table: {block_group_id}")]
    DuplicateZone {
        /// The repeated zone id.
        block_group_id: String,
    },

    /// I/O error writing the report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error writing the report.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Scored zones plus any warnings raised while merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreOutcome {
    /// One entry per merged zone, in registry order.
    pub zones: Vec<ScoredZone>,
    /// Zones that lacked a demographic row or population, with the policy
    /// applied.
    pub warnings: Vec<IncompleteZone>,
    /// Demographic rows left out because no registry zone has their id.
    pub unzoned: Vec<String>,
}

/// Validates weights, reporting every violated constraint at once.
///
/// # Errors
///
/// Returns [`ScoreError::InvalidWeights`] if any weight is negative or
/// non-finite, or if the weights don't sum to 1.
pub fn validate_weights(weights: &Weights) -> Result<(), ScoreError> {
    let mut errors = Vec::new();

    for (name, value) in weights.named() {
        if !value.is_finite() {
            errors.push(format!("weights.{name}: must be a finite number"));
        } else if value < 0.0 {
            errors.push(format!("weights.{name}: must be non-negative (got {value})"));
        }
    }

    if errors.is_empty() {
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(format!("weights must sum to 1 (got {sum})"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScoreError::InvalidWeights {
            message: errors.join("; "),
        })
    }
}

/// Validates scoring options.
///
/// # Errors
///
/// Returns [`ScoreError::InvalidOptions`] if `degenerate_value` is not a
/// number in `[0, 1]`.
pub fn validate_options(options: &ScoringOptions) -> Result<(), ScoreError> {
    if (0.0..=1.0).contains(&options.degenerate_value) {
        Ok(())
    } else {
        Err(ScoreError::InvalidOptions {
            message: format!(
                "scoring.degenerate_value must be within [0, 1] (got {})",
                options.degenerate_value
            ),
        })
    }
}

/// A registry zone joined with its demographics and point counts.
struct MergedZone {
    block_group_id: String,
    population: u64,
    median_income: Option<f64>,
    ft_count: u64,
    comp_count: u64,
}

/// Result of [`merge`].
struct Merge {
    zones: Vec<MergedZone>,
    warnings: Vec<IncompleteZone>,
    unzoned: Vec<String>,
}

/// Joins registry zones with demographics and both count maps.
fn merge(
    zone_ids: &[&str],
    demographics: &[DemographicRecord],
    ft_counts: &BTreeMap<String, u64>,
    comp_counts: &BTreeMap<String, u64>,
    policy: IncompleteZonePolicy,
) -> Result<Merge, ScoreError> {
    let mut rows = BTreeMap::new();
    for record in demographics {
        match rows.entry(record.block_group_id.as_str()) {
            Entry::Occupied(_) => {
                return Err(ScoreError::DuplicateZone {
                    block_group_id: record.block_group_id.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut seen = BTreeSet::new();
    let mut zones = Vec::with_capacity(zone_ids.len());
    let mut warnings = Vec::new();

    for &id in zone_ids {
        if !seen.insert(id) {
            continue;
        }

        let row = rows.get(id).copied();
        let (population, median_income) = match row {
            Some(&DemographicRecord {
                population: Some(population),
                median_income,
                ..
            }) => (population, median_income),
            _ => {
                let reason = if row.is_some() {
                    IncompleteReason::MissingPopulation
                } else {
                    IncompleteReason::NoDemographics
                };
                warnings.push(incomplete(id, reason, policy));
                match policy {
                    IncompleteZonePolicy::Default => (0, row.and_then(|r| r.median_income)),
                    IncompleteZonePolicy::Drop => continue,
                }
            }
        };

        zones.push(MergedZone {
            block_group_id: id.to_string(),
            population,
            median_income,
            ft_count: ft_counts.get(id).copied().unwrap_or(0),
            comp_count: comp_counts.get(id).copied().unwrap_or(0),
        });
    }

    let unzoned = rows
        .into_keys()
        .filter(|id| !seen.contains(id))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if !unzoned.is_empty() {
        log::info!(
            "Excluding {} demographic rows with no registry zone",
            unzoned.len()
        );
        log::debug!("Demographic rows with no registry zone: {unzoned:?}");
    }

    for (label, counts) in [("foot-traffic", ft_counts), ("competitor", comp_counts)] {
        let orphaned = counts.keys().filter(|id| !seen.contains(id.as_str())).count();
        if orphaned > 0 {
            log::debug!("Ignoring {label} counts for {orphaned} ids outside the registry");
        }
    }

    Ok(Merge {
        zones,
        warnings,
        unzoned,
    })
}

fn incomplete(id: &str, reason: IncompleteReason, policy: IncompleteZonePolicy) -> IncompleteZone {
    let warning = IncompleteZone {
        block_group_id: id.to_string(),
        reason,
        policy,
    };
    log::warn!("{warning}");
    warning
}

/// Merges, normalizes, and scores every registry zone in `zone_ids`.
///
/// Weights and options are validated before any work is done. A zone with
/// no demographic row or no population follows
/// `options.incomplete_zone`. Demographic rows whose id is not in
/// `zone_ids` are excluded and listed in [`ScoreOutcome::unzoned`]. Zones
/// with no observed points get counts of 0. A metric with no spread across the
/// run normalizes to `options.degenerate_value` for every zone. Missing
/// median income normalizes to 0 and doesn't affect the income range.
///
/// # Errors
///
/// Returns [`ScoreError::InvalidWeights`] or [`ScoreError::InvalidOptions`]
/// for bad configuration and [`ScoreError::DuplicateZone`] if a zone id
/// repeats in `demographics`.
#[allow(clippy::cast_precision_loss)]
pub fn score(
    zone_ids: &[&str],
    demographics: &[DemographicRecord],
    ft_counts: &BTreeMap<String, u64>,
    comp_counts: &BTreeMap<String, u64>,
    weights: &Weights,
    options: &ScoringOptions,
) -> Result<ScoreOutcome, ScoreError> {
    validate_weights(weights)?;
    validate_options(options)?;

    let Merge {
        zones: merged,
        warnings,
        unzoned,
    } = merge(
        zone_ids,
        demographics,
        ft_counts,
        comp_counts,
        options.incomplete_zone,
    )?;

    let pop_range = MinMax::of(merged.iter().map(|z| z.population as f64));
    let inc_range = MinMax::of(merged.iter().filter_map(|z| z.median_income));
    let ft_range = MinMax::of(merged.iter().map(|z| z.ft_count as f64));
    let comp_range = MinMax::of(merged.iter().map(|z| z.comp_count as f64));

    let degenerate = options.degenerate_value;
    for (metric, range) in [
        ("population", pop_range),
        ("median_income", inc_range),
        ("ft_count", ft_range),
        ("comp_count", comp_range),
    ] {
        if let Some(range) = range
            && range.is_degenerate()
        {
            log::debug!(
                "{metric} has no spread (all {}); normalizing to {degenerate}",
                range.min
            );
        }
    }

    let norm = |range: Option<MinMax>, value: f64| {
        range.map_or(degenerate, |r| r.normalize(value, degenerate))
    };

    let zones = merged
        .into_iter()
        .map(|zone| {
            let pop_norm = norm(pop_range, zone.population as f64);
            let inc_norm = zone
                .median_income
                .map_or(0.0, |income| norm(inc_range, income));
            let ft_norm = norm(ft_range, zone.ft_count as f64);
            let comp_norm = norm(comp_range, zone.comp_count as f64);

            let composite = weights.population.mul_add(
                pop_norm,
                weights.income.mul_add(
                    inc_norm,
                    weights
                        .foot_traffic
                        .mul_add(ft_norm, weights.competition * (1.0 - comp_norm)),
                ),
            );

            ScoredZone {
                block_group_id: zone.block_group_id,
                population: zone.population,
                ft_count: zone.ft_count,
                comp_count: zone.comp_count,
                score: composite.clamp(0.0, 1.0),
                median_income: zone.median_income,
                pop_norm,
                inc_norm,
                ft_norm,
                comp_norm,
            }
        })
        .collect::<Vec<_>>();

    log::info!(
        "Scored {} zones ({} incomplete, policy: {})",
        zones.len(),
        warnings.len(),
        options.incomplete_zone
    );

    Ok(ScoreOutcome {
        zones,
        warnings,
        unzoned,
    })
}
