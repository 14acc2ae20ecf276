//! Overlay primitives: pairwise intersection, clipping and geometry merge.
//!
//! Polygon operands act as the clip region for the other operand, so the
//! output keeps the lower dimension of the pair.

use crate::models::polygonal;
use geo::algorithm::bool_ops::BooleanOps;
use geo::algorithm::intersects::Intersects;
use geo::{Geometry as GeoGeometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};

fn lines_of(geom: &GeoGeometry) -> Option<MultiLineString> {
    match geom {
        GeoGeometry::Line(l) => Some(MultiLineString::new(vec![LineString::from(vec![l.start, l.end])])),
        GeoGeometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        GeoGeometry::MultiLineString(mls) => Some(mls.clone()),
        _ => None,
    }
}

fn points_of(geom: &GeoGeometry) -> Option<MultiPoint> {
    match geom {
        GeoGeometry::Point(p) => Some(MultiPoint::new(vec![*p])),
        GeoGeometry::MultiPoint(mp) => Some(mp.clone()),
        _ => None,
    }
}

fn non_empty_points(points: Vec<Point>) -> Option<GeoGeometry> {
    match points.len() {
        0 => None,
        1 => Some(GeoGeometry::Point(points[0])),
        _ => Some(GeoGeometry::MultiPoint(MultiPoint::new(points))),
    }
}

/// Part of `geom` inside `region`
pub fn clip_to_region(geom: &GeoGeometry, region: &MultiPolygon) -> Option<GeoGeometry> {
    if let Some(polygons) = polygonal(geom) {
        let clipped = polygons.intersection(region);
        return (!clipped.0.is_empty()).then_some(GeoGeometry::MultiPolygon(clipped));
    }

    if let Some(lines) = lines_of(geom) {
        let clipped = region.clip(&lines, false);
        let parts: Vec<LineString> = clipped.into_iter().filter(|ls| ls.0.len() >= 2).collect();
        return (!parts.is_empty()).then(|| GeoGeometry::MultiLineString(MultiLineString::new(parts)));
    }

    let points = points_of(geom)?;
    non_empty_points(points.into_iter().filter(|p| region.intersects(p)).collect())
}

/// Geometric intersection of two features.
///
/// Line/line pairs have no areal or linear overlap to report and yield
/// `None`; a point intersecting a line is kept.
pub fn intersect_pair(a: &GeoGeometry, b: &GeoGeometry) -> Option<GeoGeometry> {
    if let Some(region) = polygonal(b) {
        return clip_to_region(a, &region);
    }
    if let Some(region) = polygonal(a) {
        return clip_to_region(b, &region);
    }

    if let Some(points) = points_of(a) {
        return non_empty_points(points.into_iter().filter(|p| b.intersects(p)).collect());
    }
    if let Some(points) = points_of(b) {
        return non_empty_points(points.into_iter().filter(|p| a.intersects(p)).collect());
    }

    None
}

/// Merge geometries into a single, possibly multi-part geometry.
///
/// Polygons are unioned. When dimensions are mixed only the highest
/// dimension present is kept.
pub fn merge_geometries(geometries: Vec<GeoGeometry>) -> Option<GeoGeometry> {
    let mut polygons: Vec<MultiPolygon> = Vec::new();
    let mut lines: Vec<LineString> = Vec::new();
    let mut points: Vec<Point> = Vec::new();

    for geom in &geometries {
        if let Some(p) = polygonal(geom) {
            polygons.push(p);
        } else if let Some(l) = lines_of(geom) {
            lines.extend(l);
        } else if let Some(p) = points_of(geom) {
            points.extend(p);
        } else if let GeoGeometry::GeometryCollection(gc) = geom {
            if let Some(merged) = merge_geometries(gc.iter().cloned().collect()) {
                match merged {
                    GeoGeometry::MultiPolygon(mp) => polygons.push(mp),
                    GeoGeometry::MultiLineString(mls) => lines.extend(mls),
                    other => points.extend(points_of(&other).into_iter().flatten()),
                }
            }
        }
    }

    if !polygons.is_empty() {
        let merged = polygons
            .into_iter()
            .reduce(|acc, next| acc.union(&next))
            .unwrap_or_else(|| MultiPolygon::new(vec![]));
        return (!merged.0.is_empty()).then_some(GeoGeometry::MultiPolygon(merged));
    }
    if !lines.is_empty() {
        return Some(GeoGeometry::MultiLineString(MultiLineString::new(lines)));
    }
    non_empty_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Geometry, GeometryExt};
    use geo::algorithm::area::Area;

    fn square(x: f64, y: f64, size: f64) -> GeoGeometry {
        Geometry::square(x, y, size).to_geo()
    }

    #[test]
    fn test_polygon_intersection() {
        let out = intersect_pair(&square(0.0, 0.0, 10.0), &square(5.0, 5.0, 10.0)).unwrap();
        assert!((out.unsigned_area() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_polygons() {
        assert!(intersect_pair(&square(0.0, 0.0, 1.0), &square(5.0, 5.0, 1.0)).is_none());
    }

    #[test]
    fn test_line_clipped_by_polygon() {
        let line = Geometry::line_string(vec![[-5.0, 5.0], [15.0, 5.0]]).to_geo();
        match intersect_pair(&square(0.0, 0.0, 10.0), &line).unwrap() {
            GeoGeometry::MultiLineString(mls) => {
                assert_eq!(mls.0.len(), 1);
                let xs: Vec<f64> = mls.0[0].coords().map(|c| c.x).collect();
                assert!(xs.iter().all(|x| (-1e-9..=10.0 + 1e-9).contains(x)));
            }
            other => panic!("expected lines, got {:?}", other),
        }
    }

    #[test]
    fn test_points_inside_region() {
        let points = Geometry::MultiPoint { coordinates: vec![[1.0, 1.0], [20.0, 20.0]] }.to_geo();
        let out = intersect_pair(&points, &square(0.0, 0.0, 10.0)).unwrap();
        assert_eq!(out, GeoGeometry::Point(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_merge_unions_overlapping_polygons() {
        let merged =
            merge_geometries(vec![square(0.0, 0.0, 10.0), square(5.0, 0.0, 10.0)]).unwrap();
        assert!((merged.unsigned_area() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_keeps_highest_dimension() {
        let merged = merge_geometries(vec![
            Geometry::point(0.0, 0.0).to_geo(),
            Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0]]).to_geo(),
        ])
        .unwrap();
        assert!(matches!(merged, GeoGeometry::MultiLineString(_)));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_geometries(vec![]).is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_merging_a_square_with_itself_keeps_its_area(
            x in -1.0e5f64..1.0e5,
            y in -1.0e5f64..1.0e5,
            size in 1.0f64..1.0e3,
        ) {
            let merged = merge_geometries(vec![square(x, y, size), square(x, y, size)]).unwrap();
            let expected = size * size;
            proptest::prop_assert!((merged.unsigned_area() - expected).abs() / expected < 1e-6);
        }
    }
}
