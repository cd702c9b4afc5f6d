#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index and containment join for zone attribution.
//!
//! Builds an R-tree over zone polygon envelopes and assigns each point
//! record to the zone whose polygon contains it, then counts points per
//! zone. Points with unusable coordinates are reported individually and
//! never abort the join.

use std::collections::BTreeMap;

use geo::{BoundingRect as _, Contains as _, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use site_scout_source_models::Located;
use site_scout_zone_models::Zone;

/// A zone polygon stored in the R-tree.
struct ZoneEntry<'a> {
    id: &'a str,
    envelope: AABB<[f64; 2]>,
    polygon: &'a MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over a set of zones.
///
/// Borrows the zones for the duration of one run.
pub struct ZoneIndex<'a> {
    tree: RTree<ZoneEntry<'a>>,
}

impl<'a> ZoneIndex<'a> {
    /// Bulk-loads the zone envelopes into an R-tree.
    #[must_use]
    pub fn new(zones: &'a [Zone]) -> Self {
        let entries: Vec<ZoneEntry<'a>> = zones
            .iter()
            .filter_map(|zone| {
                let Some(envelope) = compute_envelope(&zone.geometry) else {
                    log::warn!("Zone {} has empty geometry, not indexed", zone.id);
                    return None;
                };
                Some(ZoneEntry {
                    id: &zone.id,
                    envelope,
                    polygon: &zone.geometry,
                })
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Indexed {} zones", tree.size());

        Self { tree }
    }

    /// Number of indexed zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no zones are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Look up the zone containing a point.
    ///
    /// Points on a polygon boundary are not contained by it. Zones are
    /// expected to tile without overlap; if several contain the point the
    /// smallest id wins so the result doesn't depend on tree order.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<&'a str> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.id)
            .min()
    }
}

/// Why a point's coordinates were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryIssue {
    /// Latitude or longitude is NaN or infinite.
    NonFinite,
    /// Latitude outside `-90..=90`.
    LatitudeOutOfRange,
    /// Longitude outside `-180..=180`.
    LongitudeOutOfRange,
}

impl std::fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NonFinite => "coordinates are not finite numbers",
            Self::LatitudeOutOfRange => "latitude outside -90..90",
            Self::LongitudeOutOfRange => "longitude outside -180..180",
        })
    }
}

/// A point record excluded from aggregation because of its coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid geometry for point {point_id} (lat={latitude}, lng={longitude}): {issue}")]
pub struct InvalidGeometry {
    /// Id of the rejected record.
    pub point_id: String,
    /// Latitude as received.
    pub latitude: f64,
    /// Longitude as received.
    pub longitude: f64,
    /// What was wrong with it.
    pub issue: GeometryIssue,
}

/// Result of joining one point dataset against the zones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Points per zone id. Zones with no points are absent.
    pub counts: BTreeMap<String, u64>,
    /// Records excluded for unusable coordinates.
    pub rejected: Vec<InvalidGeometry>,
    /// Valid points that fell outside every zone.
    pub unmatched: u64,
}

impl Aggregation {
    /// Total points assigned to some zone.
    #[must_use]
    pub fn matched(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Checks that a record has finite, in-range WGS84 coordinates.
///
/// # Errors
///
/// Returns [`InvalidGeometry`] describing the first problem found.
pub fn validate_point<P: Located>(point: &P) -> Result<geo::Point<f64>, InvalidGeometry> {
    let (lat, lng) = (point.latitude(), point.longitude());

    let issue = if !lat.is_finite() || !lng.is_finite() {
        Some(GeometryIssue::NonFinite)
    } else if !(-90.0..=90.0).contains(&lat) {
        Some(GeometryIssue::LatitudeOutOfRange)
    } else if !(-180.0..=180.0).contains(&lng) {
        Some(GeometryIssue::LongitudeOutOfRange)
    } else {
        None
    };

    match issue {
        None => Ok(geo::Point::new(lng, lat)),
        Some(issue) => Err(InvalidGeometry {
            point_id: point.point_id().to_string(),
            latitude: lat,
            longitude: lng,
            issue,
        }),
    }
}

/// Assigns every point to its containing zone and counts points per zone.
///
/// Counting is a commutative reduction, so the result is identical for any
/// ordering of `points`.
#[must_use]
pub fn aggregate<P: Located>(points: &[P], index: &ZoneIndex<'_>, label: &str) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for point in points {
        let location = match validate_point(point) {
            Ok(location) => location,
            Err(invalid) => {
                log::warn!("{label}: {invalid}");
                aggregation.rejected.push(invalid);
                continue;
            }
        };

        match index.lookup(location.x(), location.y()) {
            Some(zone_id) => {
                *aggregation.counts.entry(zone_id.to_string()).or_insert(0) += 1;
            }
            None => aggregation.unmatched += 1,
        }
    }

    log::info!(
        "{label}: {} of {} points joined to {} zones ({} outside all zones, {} rejected)",
        aggregation.matched(),
        points.len(),
        aggregation.counts.len(),
        aggregation.unmatched,
        aggregation.rejected.len()
    );

    aggregation
}

/// `[min_lng, min_lat, max_lng, max_lat]` of the records with valid
/// coordinates.
#[must_use]
pub fn point_bounds<P: Located>(points: &[P]) -> Option<[f64; 4]> {
    points
        .iter()
        .filter_map(|p| validate_point(p).ok())
        .fold(None, |acc, p| {
            let (x, y) = (p.x(), p.y());
            Some(match acc {
                None => [x, y, x, y],
                Some([min_x, min_y, max_x, max_y]) => {
                    [min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)]
                }
            })
        })
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
