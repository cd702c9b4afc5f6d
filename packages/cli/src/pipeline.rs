//! The synchronous scoring core of a run.
//!
//! Takes already-materialized zones and tables, so it never touches the
//! network and can be re-run in-process with different parameters.

use site_scout_scoring::ScoreError;
use site_scout_scoring_models::{IncompleteZone, ScoredZone, ScoringOptions, Weights};
use site_scout_source::Tables;
use site_scout_source_models::Located;
use site_scout_spatial::{Aggregation, ZoneIndex};
use site_scout_zone_models::Zone;

/// Everything produced by one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Top zones, best first.
    pub ranked: Vec<ScoredZone>,
    /// Number of zones that were scored before truncation.
    pub scored_zones: usize,
    /// Foot-traffic containment join result.
    pub foot_traffic: Aggregation,
    /// Competitor containment join result.
    pub competitors: Aggregation,
    /// Zones that lacked a demographic row or population.
    pub warnings: Vec<IncompleteZone>,
    /// Demographic rows with no zone in `zones`, left out of scoring.
    pub unzoned: Vec<String>,
}

/// Aggregates both point tables into `zones`, scores every zone, and keeps
/// the best `top_n`.
///
/// The zone set decides what is scored: demographic rows for ids outside
/// `zones` are excluded, and zones with no demographic row follow
/// `options.incomplete_zone`.
///
/// # Errors
///
/// Returns [`ScoreError`] for invalid weights or options (checked before
/// any aggregation) or duplicate demographic zones.
pub fn rank_zones(
    zones: &[Zone],
    tables: &Tables,
    weights: &Weights,
    options: &ScoringOptions,
    top_n: usize,
) -> Result<Ranking, ScoreError> {
    site_scout_scoring::validate_weights(weights)?;
    site_scout_scoring::validate_options(options)?;

    log_points("Foot-traffic", &tables.foot_traffic);
    log_points("Competitor", &tables.competitors);

    let index = ZoneIndex::new(zones);
    let foot_traffic = site_scout_spatial::aggregate(&tables.foot_traffic, &index, "Foot traffic");
    let competitors = site_scout_spatial::aggregate(&tables.competitors, &index, "Competitors");

    let zone_ids = zones.iter().map(|z| z.id.as_str()).collect::<Vec<_>>();
    let outcome = site_scout_scoring::score(
        &zone_ids,
        &tables.demographics,
        &foot_traffic.counts,
        &competitors.counts,
        weights,
        options,
    )?;

    let scored_zones = outcome.zones.len();
    let ranked = site_scout_scoring::rank(outcome.zones, top_n);

    Ok(Ranking {
        ranked,
        scored_zones,
        foot_traffic,
        competitors,
        warnings: outcome.warnings,
        unzoned: outcome.unzoned,
    })
}

fn log_points<P: Located>(label: &str, points: &[P]) {
    match site_scout_spatial::point_bounds(points) {
        Some([min_x, min_y, max_x, max_y]) => log::info!(
            "{label} points: {} records, bounds ({min_x:.5}, {min_y:.5}) - ({max_x:.5}, {max_y:.5})",
            points.len()
        ),
        None => log::info!("{label} points: {} records, no valid coordinates", points.len()),
    }
}

/// Renders the first `n` ranked zones as a plain-text table.
#[must_use]
pub fn format_top(ranked: &[ScoredZone], n: usize) -> String {
    use std::fmt::Write as _;

    let mut out = format!(
        "{:<16} {:>10} {:>8} {:>10} {:>7}\n",
        "block_group_id", "population", "ft_count", "comp_count", "score"
    );
    for zone in ranked.iter().take(n) {
        let _ = writeln!(
            out,
            "{:<16} {:>10} {:>8} {:>10} {:>7.4}",
            zone.block_group_id, zone.population, zone.ft_count, zone.comp_count, zone.score
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};
    use site_scout_scoring_models::{IncompleteReason, IncompleteZonePolicy};
    use site_scout_source_models::{CompetitorRecord, DemographicRecord, FootTrafficRecord};

    fn square(id: &str, x: f64) -> Zone {
        let ring = LineString::from(vec![
            (x, 30.0),
            (x + 0.01, 30.0),
            (x + 0.01, 30.01),
            (x, 30.01),
            (x, 30.0),
        ]);
        Zone {
            id: id.to_string(),
            region_code: "48453".to_string(),
            geometry: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn zones() -> Vec<Zone> {
        vec![
            square("Z1", -97.75),
            square("Z2", -97.73),
            square("Z3", -97.71),
        ]
    }

    fn ft(id: u8, lng: f64, lat: f64) -> FootTrafficRecord {
        FootTrafficRecord {
            site_id: format!("ft{id}"),
            latitude: lat,
            longitude: lng,
            week_start: None,
            visitor_count: 1,
        }
    }

    fn tables() -> Tables {
        let mut foot_traffic: Vec<FootTrafficRecord> = (0..10u8)
            .map(|i| ft(i, f64::from(i).mul_add(0.0001, -97.745), 30.005))
            .collect();
        foot_traffic.push(ft(98, -90.0, 40.0));
        foot_traffic.push(ft(99, f64::NAN, 30.005));

        let competitors = (0..5u8)
            .map(|i| CompetitorRecord {
                comp_id: format!("c{i}"),
                latitude: f64::from(i).mul_add(0.001, 30.002),
                longitude: -97.725,
            })
            .collect();

        let demographics = vec![
            DemographicRecord {
                block_group_id: "Z1".to_string(),
                population: Some(1000),
                median_income: Some(50000.0),
            },
            DemographicRecord {
                block_group_id: "Z2".to_string(),
                population: Some(2000),
                median_income: Some(60000.0),
            },
            DemographicRecord {
                block_group_id: "Z3".to_string(),
                population: Some(500),
                median_income: Some(40000.0),
            },
        ];

        Tables {
            competitors,
            demographics,
            foot_traffic,
        }
    }

    #[test]
    fn three_zone_example_end_to_end() {
        let zones = zones();
        let ranking = rank_zones(
            &zones,
            &tables(),
            &Weights::default(),
            &ScoringOptions::default(),
            20,
        )
        .unwrap();

        assert_eq!(ranking.foot_traffic.counts.get("Z1"), Some(&10));
        assert_eq!(ranking.foot_traffic.unmatched, 1);
        assert_eq!(ranking.foot_traffic.rejected.len(), 1);
        assert_eq!(ranking.competitors.counts.get("Z2"), Some(&5));

        let order: Vec<&str> = ranking
            .ranked
            .iter()
            .map(|z| z.block_group_id.as_str())
            .collect();
        assert_eq!(order, vec!["Z1", "Z2", "Z3"]);

        let z1 = &ranking.ranked[0];
        assert_eq!((z1.ft_count, z1.comp_count), (10, 0));
        assert!((z1.ft_norm - 1.0).abs() < 1e-9);
        assert!(z1.comp_norm.abs() < 1e-9);
        let z3 = &ranking.ranked[2];
        assert_eq!((z3.ft_count, z3.comp_count), (0, 0));
        assert!(z3.pop_norm.abs() < 1e-9);
        assert!(ranking.ranked.iter().all(|z| (0.0..=1.0).contains(&z.score)));
    }

    #[test]
    fn top_n_limits_report_rows() {
        let zones = zones();
        let ranking = rank_zones(
            &zones,
            &tables(),
            &Weights::default(),
            &ScoringOptions::default(),
            2,
        )
        .unwrap();
        assert_eq!(ranking.scored_zones, 3);
        assert_eq!(ranking.ranked.len(), 2);
    }

    #[test]
    fn invalid_weights_fail_before_aggregation() {
        let zones = zones();
        let weights = Weights {
            population: 0.6,
            ..Weights::default()
        };
        assert!(matches!(
            rank_zones(&zones, &tables(), &weights, &ScoringOptions::default(), 20),
            Err(ScoreError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn reruns_with_different_parameters_in_one_process() {
        let zones = zones();
        let tables = tables();
        let competition_only = Weights {
            population: 0.0,
            foot_traffic: 0.0,
            competition: 1.0,
            income: 0.0,
        };

        let first = rank_zones(&zones, &tables, &competition_only, &ScoringOptions::default(), 3)
            .unwrap();
        let again = rank_zones(&zones, &tables, &competition_only, &ScoringOptions::default(), 3)
            .unwrap();
        assert_eq!(first.ranked, again.ranked);

        // Z1 and Z3 tie at 1.0 and are ordered by id.
        let order: Vec<&str> = first
            .ranked
            .iter()
            .map(|z| z.block_group_id.as_str())
            .collect();
        assert_eq!(order, vec!["Z1", "Z3", "Z2"]);
    }

    #[test]
    fn zone_set_decides_what_is_scored() {
        let zones = vec![square("Z1", -97.75), square("Z2", -97.73), square("Z4", -97.69)];
        let mut tables = tables();
        tables.demographics.push(DemographicRecord {
            block_group_id: "Z9".to_string(),
            population: Some(50000),
            median_income: None,
        });

        let ranking = rank_zones(
            &zones,
            &tables,
            &Weights::default(),
            &ScoringOptions::default(),
            20,
        )
        .unwrap();

        let mut scored: Vec<&str> = ranking
            .ranked
            .iter()
            .map(|z| z.block_group_id.as_str())
            .collect();
        scored.sort_unstable();
        assert_eq!(scored, vec!["Z1", "Z2", "Z4"]);
        assert_eq!(ranking.unzoned, vec!["Z3".to_string(), "Z9".to_string()]);
        assert_eq!(ranking.warnings.len(), 1);
        assert_eq!(ranking.warnings[0].block_group_id, "Z4");
        assert_eq!(ranking.warnings[0].reason, IncompleteReason::NoDemographics);

        let dropped = rank_zones(
            &zones,
            &tables,
            &Weights::default(),
            &ScoringOptions {
                incomplete_zone: IncompleteZonePolicy::Drop,
                ..ScoringOptions::default()
            },
            20,
        )
        .unwrap();
        assert_eq!(dropped.scored_zones, 2);
        assert!(dropped.ranked.iter().all(|z| z.block_group_id != "Z4"));
    }

    #[test]
    fn formats_top_rows() {
        let zones = zones();
        let ranking = rank_zones(
            &zones,
            &tables(),
            &Weights::default(),
            &ScoringOptions::default(),
            20,
        )
        .unwrap();

        let text = format_top(&ranking.ranked, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("block_group_id"));
        assert!(lines[1].starts_with("Z1 "));
        assert!(lines[2].starts_with("Z2 "));
    }
}
