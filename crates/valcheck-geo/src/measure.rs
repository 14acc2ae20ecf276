//! Derived geometry fields: representative point, area and length.

use crate::models::polygonal;
use geo::algorithm::area::Area;
use geo::algorithm::centroid::Centroid;
use geo::{Coord, Geometry as GeoGeometry, LineString};
use valcheck_core::models::Measurements;

const SQ_METERS_PER_HECTARE: f64 = 10_000.0;
const METERS_PER_KILOMETER: f64 = 1_000.0;

fn line_parts(geom: &GeoGeometry) -> Vec<&LineString> {
    match geom {
        GeoGeometry::LineString(ls) => vec![ls],
        GeoGeometry::MultiLineString(mls) => mls.0.iter().collect(),
        _ => Vec::new(),
    }
}

fn segment_length(a: Coord, b: Coord) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Point halfway along the combined length of the parts, in part order
fn midpoint_along(parts: &[&LineString], total: f64) -> Option<Coord> {
    let mut remaining = total / 2.0;
    for part in parts {
        for segment in part.lines() {
            let len = segment_length(segment.start, segment.end);
            if len > 0.0 && remaining <= len {
                let t = remaining / len;
                return Some(Coord {
                    x: segment.start.x + t * (segment.end.x - segment.start.x),
                    y: segment.start.y + t * (segment.end.y - segment.start.y),
                });
            }
            remaining -= len;
        }
    }
    parts.iter().find_map(|p| p.0.first().copied())
}

/// Measure a geometry.
///
/// Polygons report their centroid and area in hectares, lines their
/// midpoint and length in kilometres, points their own coordinates.
pub fn measure(geom: &GeoGeometry) -> Measurements {
    if let Some(polygons) = polygonal(geom) {
        let (x, y) = polygons.centroid().map(|c| (c.x(), c.y())).unwrap_or_default();
        return Measurements {
            x,
            y,
            area_ha: Some(polygons.unsigned_area() / SQ_METERS_PER_HECTARE),
            length_km: None,
        };
    }

    let parts = line_parts(geom);
    if !parts.is_empty() {
        let total: f64 = parts
            .iter()
            .flat_map(|p| p.lines())
            .map(|s| segment_length(s.start, s.end))
            .sum();
        let mid = midpoint_along(&parts, total).unwrap_or(Coord { x: 0.0, y: 0.0 });
        return Measurements {
            x: mid.x,
            y: mid.y,
            area_ha: None,
            length_km: Some(total / METERS_PER_KILOMETER),
        };
    }

    let (x, y) = match geom {
        GeoGeometry::Point(p) => (p.x(), p.y()),
        other => other.centroid().map(|c| (c.x(), c.y())).unwrap_or_default(),
    };
    Measurements { x, y, area_ha: None, length_km: None }
}
