//! R-tree over feature bounding boxes, used to find overlay candidates.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::Geometry as GeoGeometry;
use rstar::{RTree, RTreeObject, AABB};

/// Bounding box of one feature, keyed by its position in the layer
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGeometry {
    pub id: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexedGeometry {
    /// `None` for empty geometries, which have no bounding box
    pub fn new(id: usize, geometry: &GeoGeometry) -> Option<Self> {
        let envelope = envelope_of(geometry)?;
        Some(Self { id, envelope })
    }
}

impl RTreeObject for IndexedGeometry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(geometry: &GeoGeometry) -> Option<AABB<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    Some(AABB::from_corners([min.x, min.y], [max.x, max.y]))
}

/// Spatial index for candidate lookups
pub struct SpatialIndex {
    tree: RTree<IndexedGeometry>,
}

impl SpatialIndex {
    /// Bulk load an index from `(id, geometry)` pairs
    pub fn from_geometries<'a>(geometries: impl IntoIterator<Item = (usize, &'a GeoGeometry)>) -> Self {
        let indexed: Vec<IndexedGeometry> = geometries
            .into_iter()
            .filter_map(|(id, geom)| IndexedGeometry::new(id, geom))
            .collect();

        Self { tree: RTree::bulk_load(indexed) }
    }

    /// Ids whose bounding boxes intersect the geometry's bounding box, ascending
    pub fn candidates(&self, geometry: &GeoGeometry) -> Vec<usize> {
        let Some(envelope) = envelope_of(geometry) else {
            return Vec::new();
        };
        let mut ids: Vec<usize> =
            self.tree.locate_in_envelope_intersecting(&envelope).map(|g| g.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Geometry, GeometryExt};

    #[test]
    fn test_candidates_by_envelope() {
        let geoms = vec![
            Geometry::square(0.0, 0.0, 10.0).to_geo(),
            Geometry::square(100.0, 100.0, 10.0).to_geo(),
            Geometry::point(5.0, 5.0).to_geo(),
        ];
        let index = SpatialIndex::from_geometries(geoms.iter().enumerate());
        assert_eq!(index.len(), 3);

        let probe = Geometry::square(4.0, 4.0, 2.0).to_geo();
        assert_eq!(index.candidates(&probe), vec![0, 2]);

        let far = Geometry::point(500.0, 500.0).to_geo();
        assert!(index.candidates(&far).is_empty());
    }

    #[test]
    fn test_empty_geometries_are_not_indexed() {
        let empty = Geometry::MultiPoint { coordinates: vec![] }.to_geo();
        let index = SpatialIndex::from_geometries(vec![(0, &empty)]);
        assert!(index.is_empty());
    }
}
