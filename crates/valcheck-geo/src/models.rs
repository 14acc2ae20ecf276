//! Geometry models for valcheck-geo.
//!
//! This module re-exports canonical types from `valcheck-core` and converts
//! them to and from the `geo` crate.

use geo::Geometry as GeoGeometry;

// Re-export canonical types from valcheck-core
pub use valcheck_core::models::{Distance, Geometry, GeometryType, Measurements};

fn to_line(coords: &[[f64; 2]]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(|c| geo::Coord { x: c[0], y: c[1] }).collect())
}

fn to_polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
    let mut rings = rings.iter().map(|r| to_line(r));
    let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(vec![]));
    geo::Polygon::new(exterior, rings.collect())
}

fn from_line(line: &geo::LineString) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn from_polygon(polygon: &geo::Polygon) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(from_line).collect()
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> GeoGeometry {
    match geom {
        Geometry::Point { coordinates } => {
            GeoGeometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
        }
        Geometry::LineString { coordinates } => GeoGeometry::LineString(to_line(coordinates)),
        Geometry::Polygon { coordinates } => GeoGeometry::Polygon(to_polygon(coordinates)),
        Geometry::MultiPoint { coordinates } => GeoGeometry::MultiPoint(geo::MultiPoint::new(
            coordinates.iter().map(|c| geo::Point::new(c[0], c[1])).collect(),
        )),
        Geometry::MultiLineString { coordinates } => GeoGeometry::MultiLineString(
            geo::MultiLineString::new(coordinates.iter().map(|l| to_line(l)).collect()),
        ),
        Geometry::MultiPolygon { coordinates } => GeoGeometry::MultiPolygon(
            geo::MultiPolygon::new(coordinates.iter().map(|p| to_polygon(p)).collect()),
        ),
    }
}

/// Convert a geo::Geometry to a canonical Geometry.
///
/// Geometry collections are merged into their highest-dimension member type.
pub fn from_geo_geometry(geom: &GeoGeometry) -> Geometry {
    match geom {
        GeoGeometry::Point(p) => Geometry::Point { coordinates: [p.x(), p.y()] },
        GeoGeometry::Line(l) => Geometry::LineString {
            coordinates: vec![[l.start.x, l.start.y], [l.end.x, l.end.y]],
        },
        GeoGeometry::LineString(ls) => Geometry::LineString { coordinates: from_line(ls) },
        GeoGeometry::Polygon(p) => Geometry::Polygon { coordinates: from_polygon(p) },
        GeoGeometry::MultiPoint(mp) => Geometry::MultiPoint {
            coordinates: mp.iter().map(|p| [p.x(), p.y()]).collect(),
        },
        GeoGeometry::MultiLineString(mls) => {
            Geometry::MultiLineString { coordinates: mls.iter().map(from_line).collect() }
        }
        GeoGeometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon { coordinates: mp.iter().map(from_polygon).collect() }
        }
        GeoGeometry::GeometryCollection(gc) => {
            match crate::overlay::merge_geometries(gc.iter().cloned().collect()) {
                Some(merged) => from_geo_geometry(&merged),
                None => Geometry::MultiPoint { coordinates: vec![] },
            }
        }
        GeoGeometry::Rect(r) => Geometry::Polygon { coordinates: from_polygon(&r.to_polygon()) },
        GeoGeometry::Triangle(t) => {
            Geometry::Polygon { coordinates: from_polygon(&t.to_polygon()) }
        }
    }
}

/// Extension trait for Geometry with geo-crate operations
pub trait GeometryExt {
    /// Convert to geo::Geometry
    fn to_geo(&self) -> GeoGeometry;
}

impl GeometryExt for Geometry {
    fn to_geo(&self) -> GeoGeometry {
        to_geo_geometry(self)
    }
}

/// Polygonal part of a geometry, if it has one
pub fn polygonal(geom: &GeoGeometry) -> Option<geo::MultiPolygon> {
    match geom {
        GeoGeometry::Polygon(p) => Some(geo::MultiPolygon::new(vec![p.clone()])),
        GeoGeometry::MultiPolygon(mp) => Some(mp.clone()),
        GeoGeometry::Rect(r) => Some(geo::MultiPolygon::new(vec![r.to_polygon()])),
        GeoGeometry::Triangle(t) => Some(geo::MultiPolygon::new(vec![t.to_polygon()])),
        GeoGeometry::GeometryCollection(gc) => {
            let polygons: Vec<geo::Polygon> =
                gc.iter().filter_map(polygonal).flat_map(|mp| mp.0).collect();
            (!polygons.is_empty()).then(|| geo::MultiPolygon::new(polygons))
        }
        _ => None,
    }
}
