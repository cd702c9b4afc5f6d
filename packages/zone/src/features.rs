//! Parses `GeoJSON` feature collections into [`Zone`] values.
//!
//! Uses the source's [`ZoneFieldMapping`] to find the zone id and region
//! code on each feature, and reprojects Web Mercator collections to
//! longitude/latitude so zones line up with the point data.

use std::collections::BTreeSet;

use geo::{Coord, MapCoordsInPlace as _, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use site_scout_zone_models::{Zone, ZoneFieldMapping, derive_county_geoid};

use crate::ZoneError;

/// WGS84 semi-major axis in meters (Web Mercator sphere radius).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Coordinate reference systems we know how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude degrees (CRS84, EPSG:4326, NAD83 EPSG:4269).
    Geographic,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Classifies a legacy `GeoJSON` `crs.properties.name` value such as
    /// `"urn:ogc:def:crs:EPSG::3857"` or `"EPSG:4326"`.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::UnsupportedCrs`] for anything else.
    pub fn from_name(name: &str) -> Result<Self, ZoneError> {
        let code = name.rsplit(':').next().unwrap_or(name).trim();
        match code {
            "CRS84" | "4326" | "4269" => Ok(Self::Geographic),
            "3857" | "900913" | "102100" => Ok(Self::WebMercator),
            _ => Err(ZoneError::UnsupportedCrs(name.to_string())),
        }
    }

    fn of_collection(collection: &FeatureCollection) -> Result<Self, ZoneError> {
        let name = collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("crs"))
            .and_then(|crs| crs.get("properties"))
            .and_then(|props| props.get("name"))
            .and_then(serde_json::Value::as_str);

        name.map_or(Ok(Self::Geographic), Self::from_name)
    }
}

/// Parses a `GeoJSON` `FeatureCollection` into zones.
///
/// Features with null or non-areal geometry are skipped with a warning.
///
/// # Errors
///
/// * [`ZoneError::Schema`] if the document isn't a `FeatureCollection` or a
///   feature lacks the id (or configured region) property
/// * [`ZoneError::UnsupportedCrs`] for an unknown declared CRS
/// * [`ZoneError::DuplicateZone`] if two features share an id
pub fn parse_zones(
    raw: &str,
    fields: &ZoneFieldMapping,
    label: &str,
) -> Result<Vec<Zone>, ZoneError> {
    let schema_error = |message: String| ZoneError::Schema {
        table: label.to_string(),
        message,
    };

    let geojson: GeoJson = raw
        .parse()
        .map_err(|e| schema_error(format!("invalid GeoJSON: {e}")))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(schema_error("expected a FeatureCollection".to_string()));
    };

    let crs = Crs::of_collection(&collection)?;
    if crs == Crs::WebMercator {
        log::info!("{label}: reprojecting Web Mercator coordinates to longitude/latitude");
    }

    let mut seen = BTreeSet::new();
    let mut zones = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for (i, feature) in collection.features.into_iter().enumerate() {
        let id = property_string(&feature, &fields.id).ok_or_else(|| {
            schema_error(format!("feature {i} has no '{}' property", fields.id))
        })?;

        let region_code = match &fields.region {
            Some(field) => property_string(&feature, field).ok_or_else(|| {
                schema_error(format!("feature {i} ({id}) has no '{field}' property"))
            })?,
            None => derive_county_geoid(&id).unwrap_or(&id).to_string(),
        };

        let Some(mut geometry) = feature.geometry.and_then(to_multipolygon) else {
            log::warn!("{label}: zone {id} has no polygon geometry, skipping");
            skipped += 1;
            continue;
        };

        if crs == Crs::WebMercator {
            geometry.map_coords_in_place(mercator_to_lng_lat);
        }

        if !seen.insert(id.clone()) {
            return Err(ZoneError::DuplicateZone(id));
        }

        zones.push(Zone {
            id,
            region_code,
            geometry,
        });
    }

    if skipped > 0 {
        log::warn!("{label}: skipped {skipped} features without polygon geometry");
    }

    Ok(zones)
}

/// Reads a feature property as a string. Numeric properties are formatted
/// so ids stored as numbers still match.
fn property_string(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Inverse spherical Mercator projection.
fn mercator_to_lng_lat(coord: Coord<f64>) -> Coord<f64> {
    let lng = (coord.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2)
        .to_degrees();
    Coord { x: lng, y: lat }
}
