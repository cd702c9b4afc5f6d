#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Types shared by the score engine, the ranker, and configuration.

use serde::{Deserialize, Serialize};

/// How far the weight sum may drift from 1.0 and still be accepted.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Composite score weights.
///
/// Population, foot traffic, and income are rewarded; competition is
/// penalized through `1 - comp_norm`. Weights must be finite,
/// non-negative, and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Weight of normalized population.
    pub population: f64,
    /// Weight of normalized foot-traffic count.
    pub foot_traffic: f64,
    /// Weight of the competitor penalty.
    pub competition: f64,
    /// Weight of normalized median income.
    #[serde(default)]
    pub income: f64,
}

impl Weights {
    /// Sum of all four weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.population + self.foot_traffic + self.competition + self.income
    }

    /// `(name, value)` pairs in a fixed order, for validation messages.
    #[must_use]
    pub const fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("population", self.population),
            ("foot_traffic", self.foot_traffic),
            ("competition", self.competition),
            ("income", self.income),
        ]
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            population: 0.35,
            foot_traffic: 0.35,
            competition: 0.30,
            income: 0.0,
        }
    }
}

/// What to do with a zone that has no demographic row or no population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteZonePolicy {
    /// Keep the zone with population 0 and unknown income.
    #[default]
    Default,
    /// Remove the zone before normalization.
    Drop,
}

impl std::fmt::Display for IncompleteZonePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Drop => "drop",
        })
    }
}

/// Options controlling edge-case handling in the score engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// Policy for zones missing demographics.
    pub incomplete_zone: IncompleteZonePolicy,
    /// Normalized value given to every zone when a metric has no spread
    /// (`max == min`). Must be within `[0, 1]`.
    pub degenerate_value: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            incomplete_zone: IncompleteZonePolicy::Default,
            degenerate_value: 0.0,
        }
    }
}

/// One zone after merge, normalization, and scoring.
///
/// Field order is the column order of the ranked report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredZone {
    /// Zone identifier.
    pub block_group_id: String,
    /// Total population (0 when defaulted).
    pub population: u64,
    /// Foot-traffic points inside the zone.
    pub ft_count: u64,
    /// Competitor points inside the zone.
    pub comp_count: u64,
    /// Composite opportunity score in `[0, 1]`.
    pub score: f64,
    /// Median household income, if known.
    pub median_income: Option<f64>,
    /// Normalized population.
    pub pop_norm: f64,
    /// Normalized median income (0 when unknown).
    pub inc_norm: f64,
    /// Normalized foot-traffic count.
    pub ft_norm: f64,
    /// Normalized competitor count.
    pub comp_norm: f64,
}

/// Why a zone's demographics were incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The demographic table has no row for the zone.
    NoDemographics,
    /// The zone's row has no population value.
    MissingPopulation,
}

/// A zone that lacked demographic data after the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteZone {
    /// Zone identifier.
    pub block_group_id: String,
    /// What was missing.
    pub reason: IncompleteReason,
    /// Policy that was applied.
    pub policy: IncompleteZonePolicy,
}

impl std::fmt::Display for IncompleteZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let missing = match self.reason {
            IncompleteReason::NoDemographics => "no demographic row",
            IncompleteReason::MissingPopulation => "no population",
        };
        let action = match self.policy {
            IncompleteZonePolicy::Default => "using population 0",
            IncompleteZonePolicy::Drop => "dropped",
        };
        write!(f, "zone {} has {missing}; {action}", self.block_group_id)
    }
}
