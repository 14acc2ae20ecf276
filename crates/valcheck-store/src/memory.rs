//! In-memory geometry engine for batch jobs and testing.
//!
//! Source datasets are registered in memory or read from GeoJSON files on
//! `open`. Every operation stores its output as a new layer behind a fresh
//! handle; layers are immutable once stored.

use crate::layer_file::{read_layer, write_layer};
use crate::where_clause::WhereClause;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use valcheck_core::models::{AttributeValue, Attributes, BufferStyle, Distance, Geometry};
use valcheck_core::{engine_error, GeometryEngine, LayerHandle, Result, Row, ValcheckError};
use valcheck_geo::buffer::buffer_geometry;
use valcheck_geo::index::SpatialIndex;
use valcheck_geo::measure::measure;
use valcheck_geo::models::{from_geo_geometry, polygonal, GeometryExt};
use valcheck_geo::overlay::{clip_to_region, intersect_pair, merge_geometries};
use valcheck_geo::validation::ensure_valid;

/// Fields written by [`GeometryEngine::add_geometry_fields`]
pub const GEOMETRY_FIELDS: [&str; 4] = ["Easting", "Northing", "AREA_HA", "LENGTH_KM"];

/// A single feature of a layer
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub attributes: Attributes,
    pub geometry: Geometry,
}

impl FeatureRecord {
    pub fn new(geometry: Geometry) -> Self {
        Self { attributes: Attributes::new(), geometry }
    }

    pub fn with(mut self, field: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }
}

/// Ordered field list plus features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    fields: Vec<String>,
    features: Vec<FeatureRecord>,
}

impl Layer {
    pub fn new(fields: Vec<String>, features: Vec<FeatureRecord>) -> Self {
        Self { fields, features }
    }

    /// Layer whose fields are every attribute name used by the features
    pub fn from_features(features: Vec<FeatureRecord>) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for feature in &features {
            for key in feature.attributes.keys() {
                if !fields.contains(key) {
                    fields.push(key.clone());
                }
            }
        }
        Self { fields, features }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// In-memory implementation of GeometryEngine
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    sources: Arc<RwLock<HashMap<PathBuf, Layer>>>,
    layers: Arc<RwLock<HashMap<LayerHandle, Arc<Layer>>>>,
    next_id: Arc<RwLock<u64>>,
}

fn lock_error<T>(_: T) -> ValcheckError {
    engine_error("layer store", "lock poisoned")
}

fn geojson_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".geojson");
    PathBuf::from(name)
}

impl MemoryEngine {
    /// Create a new in-memory engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source dataset under a path
    pub fn register(&self, path: impl Into<PathBuf>, layer: Layer) -> Result<()> {
        let mut sources = self.sources.write().map_err(lock_error)?;
        sources.insert(path.into(), layer);
        Ok(())
    }

    /// Contents of a stored layer
    pub fn layer(&self, handle: &LayerHandle) -> Result<Arc<Layer>> {
        let layers = self.layers.read().map_err(lock_error)?;
        layers
            .get(handle)
            .cloned()
            .ok_or_else(|| ValcheckError::HandleNotFound { handle: handle.to_string() })
    }

    /// Handles currently stored
    pub fn handles(&self) -> Result<Vec<LayerHandle>> {
        let layers = self.layers.read().map_err(lock_error)?;
        let mut handles: Vec<LayerHandle> = layers.keys().cloned().collect();
        handles.sort();
        Ok(handles)
    }

    fn store(&self, prefix: &str, layer: Layer) -> Result<LayerHandle> {
        let id = {
            let mut next_id = self.next_id.write().map_err(lock_error)?;
            *next_id += 1;
            *next_id
        };
        let handle = LayerHandle::new(format!("{}_{}", prefix, id));
        tracing::debug!("Stored layer {} with {} features", handle, layer.len());

        let mut layers = self.layers.write().map_err(lock_error)?;
        layers.insert(handle.clone(), Arc::new(layer));
        Ok(handle)
    }

    fn load_source(&self, path: &Path) -> Result<Layer> {
        if let Some(layer) = self.sources.read().map_err(lock_error)?.get(path) {
            return Ok(layer.clone());
        }

        let file = [path.to_path_buf(), geojson_sibling(path)]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ValcheckError::DatasetNotFound { path: path.to_path_buf() })?;
        read_layer(&file)
    }

    fn intersect_two(&self, left: &Layer, right: &Layer) -> Layer {
        let mut fields = left.fields.clone();
        let mut renamed = Vec::with_capacity(right.fields.len());
        for field in &right.fields {
            let mut name = field.clone();
            let mut suffix = 1;
            while fields.contains(&name) {
                name = format!("{}_{}", field, suffix);
                suffix += 1;
            }
            fields.push(name.clone());
            renamed.push((field.as_str(), name));
        }

        let right_geoms: Vec<geo::Geometry> =
            right.features.iter().map(|f| f.geometry.to_geo()).collect();
        let index = SpatialIndex::from_geometries(right_geoms.iter().enumerate());

        let mut features = Vec::new();
        for feature in &left.features {
            let geom = feature.geometry.to_geo();
            for candidate in index.candidates(&geom) {
                let Some(overlap) = intersect_pair(&geom, &right_geoms[candidate]) else {
                    continue;
                };
                let mut attributes = feature.attributes.clone();
                let other = &right.features[candidate].attributes;
                for (source, target) in &renamed {
                    if let Some(value) = other.get(*source) {
                        attributes.insert(target.clone(), value.clone());
                    }
                }
                features.push(FeatureRecord { attributes, geometry: from_geo_geometry(&overlap) });
            }
        }

        Layer { fields, features }
    }
}

impl GeometryEngine for MemoryEngine {
    fn exists(&self, path: &Path) -> bool {
        let registered = self.sources.read().map(|s| s.contains_key(path)).unwrap_or(false);
        registered || path.is_file() || geojson_sibling(path).is_file()
    }

    fn open(&self, path: &Path) -> Result<LayerHandle> {
        let source = self.load_source(path)?;
        let mut features = Vec::with_capacity(source.len());
        for (idx, feature) in source.features.into_iter().enumerate() {
            match ensure_valid(&idx.to_string(), &feature.geometry) {
                Ok(()) => features.push(feature),
                Err(e) => tracing::warn!("Dropping feature from {}: {}", path.display(), e),
            }
        }
        self.store("open", Layer { fields: source.fields, features })
    }

    fn buffer(
        &self,
        input: &LayerHandle,
        distance: Distance,
        style: BufferStyle,
    ) -> Result<LayerHandle> {
        let layer = self.layer(input)?;
        let meters = distance.to_meters();
        let features = layer
            .features
            .iter()
            .filter_map(|f| {
                let buffered = buffer_geometry(&f.geometry.to_geo(), meters, style)?;
                Some(FeatureRecord {
                    attributes: f.attributes.clone(),
                    geometry: from_geo_geometry(&geo::Geometry::MultiPolygon(buffered)),
                })
            })
            .collect();
        self.store("buffer", Layer { fields: layer.fields.clone(), features })
    }

    fn select(&self, input: &LayerHandle, where_clause: &str) -> Result<LayerHandle> {
        let layer = self.layer(input)?;
        let clause = WhereClause::parse(where_clause)?;
        if let Some(missing) = clause.fields().into_iter().find(|f| !layer.has_field(f)) {
            return Err(ValcheckError::WhereClause {
                clause: where_clause.to_string(),
                reason: format!("field '{}' does not exist in {}", missing, input),
            });
        }

        let features =
            layer.features.iter().filter(|f| clause.matches(&f.attributes)).cloned().collect();
        self.store("select", Layer { fields: layer.fields.clone(), features })
    }

    fn intersect(&self, layers: &[&LayerHandle]) -> Result<LayerHandle> {
        let (first, rest) = layers
            .split_first()
            .ok_or_else(|| engine_error("intersect", "no input layers"))?;

        let mut current = (*self.layer(first)?).clone();
        for handle in rest {
            let next = self.layer(handle)?;
            current = self.intersect_two(&current, &next);
        }
        self.store("intersect", current)
    }

    fn clip(&self, input: &LayerHandle, clip_layer: &LayerHandle) -> Result<LayerHandle> {
        let layer = self.layer(input)?;
        let clipper = self.layer(clip_layer)?;

        let polygons: Vec<geo::Geometry> = clipper
            .features
            .iter()
            .filter_map(|f| polygonal(&f.geometry.to_geo()))
            .map(geo::Geometry::MultiPolygon)
            .collect();
        if polygons.len() != clipper.len() {
            return Err(engine_error("clip", format!("clip layer {} is not polygonal", clip_layer)));
        }
        let region = merge_geometries(polygons)
            .as_ref()
            .and_then(polygonal)
            .unwrap_or_else(|| geo::MultiPolygon::new(vec![]));

        let features = layer
            .features
            .iter()
            .filter_map(|f| {
                let clipped = clip_to_region(&f.geometry.to_geo(), &region)?;
                Some(FeatureRecord {
                    attributes: f.attributes.clone(),
                    geometry: from_geo_geometry(&clipped),
                })
            })
            .collect();
        self.store("clip", Layer { fields: layer.fields.clone(), features })
    }

    fn dissolve(&self, input: &LayerHandle, group_fields: &[String]) -> Result<LayerHandle> {
        let layer = self.layer(input)?;
        if let Some(missing) = group_fields.iter().find(|f| !layer.has_field(f)) {
            return Err(engine_error("dissolve", format!("field '{}' not in {}", missing, input)));
        }

        let mut order: Vec<Vec<String>> = Vec::new();
        let mut groups: HashMap<Vec<String>, (Attributes, Vec<geo::Geometry>)> = HashMap::new();
        for feature in &layer.features {
            let mut attributes = Attributes::new();
            for field in group_fields {
                let value = feature.attributes.get(field).cloned().unwrap_or_default();
                attributes.insert(field.clone(), value);
            }
            let key: Vec<String> = group_fields.iter().map(|f| attributes[f].group_key()).collect();

            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (attributes, Vec::new())
            });
            entry.1.push(feature.geometry.to_geo());
        }

        let mut features = Vec::with_capacity(order.len());
        for key in order {
            let Some((attributes, geometries)) = groups.remove(&key) else {
                continue;
            };
            if let Some(merged) = merge_geometries(geometries) {
                features.push(FeatureRecord { attributes, geometry: from_geo_geometry(&merged) });
            }
        }

        self.store("dissolve", Layer { fields: group_fields.to_vec(), features })
    }

    fn add_geometry_fields(&self, input: &LayerHandle) -> Result<LayerHandle> {
        let layer = self.layer(input)?;
        let mut fields = layer.fields.clone();
        for name in GEOMETRY_FIELDS {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }

        let features = layer
            .features
            .iter()
            .map(|f| {
                let m = measure(&f.geometry.to_geo());
                let optional = |v: Option<f64>| v.map(AttributeValue::Float).unwrap_or_default();
                let mut attributes = f.attributes.clone();
                attributes.insert("Easting".to_string(), AttributeValue::Integer(m.x as i64));
                attributes.insert("Northing".to_string(), AttributeValue::Integer(m.y as i64));
                attributes.insert("AREA_HA".to_string(), optional(m.area_ha));
                attributes.insert("LENGTH_KM".to_string(), optional(m.length_km));
                FeatureRecord { attributes, geometry: f.geometry.clone() }
            })
            .collect();
        self.store("geomfields", Layer { fields, features })
    }

    fn count(&self, handle: &LayerHandle) -> Result<usize> {
        Ok(self.layer(handle)?.len())
    }

    fn list_fields(&self, handle: &LayerHandle) -> Result<Vec<String>> {
        Ok(self.layer(handle)?.fields.clone())
    }

    fn scan(&self, handle: &LayerHandle, fields: &[String]) -> Result<Vec<Row>> {
        let layer = self.layer(handle)?;
        Ok(layer
            .features
            .iter()
            .map(|f| {
                let attributes = fields
                    .iter()
                    .filter_map(|name| f.attributes.get(name).map(|v| (name.clone(), v.clone())))
                    .collect();
                Row { attributes, geometry: f.geometry.clone(), measure: measure(&f.geometry.to_geo()) }
            })
            .collect())
    }

    fn export(&self, handle: &LayerHandle, dest: &Path) -> Result<()> {
        let layer = self.layer(handle)?;
        write_layer(&layer, dest)
    }

    fn delete(&self, handle: &LayerHandle) -> Result<()> {
        let mut layers = self.layers.write().map_err(lock_error)?;
        layers
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| ValcheckError::HandleNotFound { handle: handle.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn works() -> Layer {
        Layer::from_features(vec![
            FeatureRecord::new(Geometry::square(0.0, 0.0, 100.0))
                .with("DAP_REF_NO", "W1")
                .with("RISK_LVL", "DAP"),
            FeatureRecord::new(Geometry::square(1000.0, 0.0, 100.0))
                .with("DAP_REF_NO", "W2")
                .with("RISK_LVL", "LRLI"),
        ])
    }

    fn engine_with_works() -> (MemoryEngine, LayerHandle) {
        let engine = MemoryEngine::new();
        engine.register("works", works()).unwrap();
        let handle = engine.open(Path::new("works")).unwrap();
        (engine, handle)
    }

    #[test]
    fn test_open_missing_dataset() {
        let engine = MemoryEngine::new();
        assert!(!engine.exists(Path::new("nowhere/FMZ100")));
        let err = engine.open(Path::new("nowhere/FMZ100")).unwrap_err();
        assert!(matches!(err, ValcheckError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_open_drops_invalid_geometry() {
        let engine = MemoryEngine::new();
        let mut layer = works();
        layer.features.push(FeatureRecord::new(Geometry::polygon(vec![])).with("DAP_REF_NO", "W3"));
        engine.register("works", layer).unwrap();
        let handle = engine.open(Path::new("works")).unwrap();
        assert_eq!(engine.count(&handle).unwrap(), 2);
    }

    #[test]
    fn test_select_and_unknown_field() {
        let (engine, works) = engine_with_works();
        let high = engine.select(&works, "RISK_LVL IS NULL OR RISK_LVL <> 'LRLI'").unwrap();
        assert_eq!(engine.count(&high).unwrap(), 1);

        let err = engine.select(&works, "DISTRICT = 'Tambo'").unwrap_err();
        assert!(matches!(err, ValcheckError::WhereClause { .. }));
    }

    #[test]
    fn test_intersect_keeps_both_attribute_sets() {
        let (engine, works) = engine_with_works();
        let buffered = engine.buffer(&works, Distance::meters(50.0), BufferStyle::Full).unwrap();

        engine
            .register(
                "values",
                Layer::from_features(vec![
                    FeatureRecord::new(Geometry::line_string(vec![[-100.0, 50.0], [300.0, 50.0]]))
                        .with("NAME", "Creek A")
                        .with("RISK_LVL", "value side"),
                    FeatureRecord::new(Geometry::point(5000.0, 5000.0)).with("NAME", "Far"),
                ]),
            )
            .unwrap();
        let values = engine.open(Path::new("values")).unwrap();

        let out = engine.intersect(&[&buffered, &values]).unwrap();
        let layer = engine.layer(&out).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.fields(), ["DAP_REF_NO", "RISK_LVL", "NAME", "RISK_LVL_1"]);

        let record = &layer.features()[0];
        assert_eq!(record.attributes["DAP_REF_NO"], AttributeValue::text("W1"));
        assert_eq!(record.attributes["RISK_LVL_1"], AttributeValue::text("value side"));
        assert_eq!(record.geometry.geometry_type().dimension(), 1);
    }

    #[test]
    fn test_clip_keeps_input_attributes_only() {
        let (engine, works) = engine_with_works();
        engine
            .register(
                "values",
                Layer::from_features(vec![
                    FeatureRecord::new(Geometry::point(50.0, 50.0)).with("NAME", "Hut")
                ]),
            )
            .unwrap();
        let values = engine.open(Path::new("values")).unwrap();
        let out = engine.clip(&values, &works).unwrap();
        assert_eq!(engine.list_fields(&out).unwrap(), vec!["NAME".to_string()]);
        assert_eq!(engine.count(&out).unwrap(), 1);

        let err = engine.clip(&works, &values).unwrap_err();
        assert!(matches!(err, ValcheckError::Engine { .. }));
    }

    #[test]
    fn test_dissolve_merges_duplicate_tuples_and_is_idempotent() {
        let engine = MemoryEngine::new();
        engine
            .register(
                "pieces",
                Layer::from_features(vec![
                    FeatureRecord::new(Geometry::square(0.0, 0.0, 10.0)).with("ID", "A"),
                    FeatureRecord::new(Geometry::square(10.0, 0.0, 10.0)).with("ID", "A"),
                    FeatureRecord::new(Geometry::square(50.0, 0.0, 10.0)).with("ID", "B"),
                ]),
            )
            .unwrap();
        let pieces = engine.open(Path::new("pieces")).unwrap();
        let group = vec!["ID".to_string()];

        let once = engine.dissolve(&pieces, &group).unwrap();
        let twice = engine.dissolve(&once, &group).unwrap();
        assert_eq!(engine.count(&once).unwrap(), 2);
        assert_eq!(engine.count(&twice).unwrap(), 2);

        let rows = engine.scan(&once, &group).unwrap();
        assert_eq!(rows[0].attributes["ID"], AttributeValue::text("A"));
        assert!((rows[0].measure.area_ha.unwrap() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_fields() {
        let (engine, works) = engine_with_works();
        let out = engine.add_geometry_fields(&works).unwrap();
        let fields = engine.list_fields(&out).unwrap();
        assert!(GEOMETRY_FIELDS.iter().all(|g| fields.iter().any(|f| f == g)));

        let rows = engine.scan(&out, &fields).unwrap();
        assert_eq!(rows[0].attributes["Easting"], AttributeValue::Integer(50));
        assert_eq!(rows[0].attributes["AREA_HA"], AttributeValue::Float(1.0));
        assert_eq!(rows[0].attributes["LENGTH_KM"], AttributeValue::Null);
    }

    #[test]
    fn test_delete_and_handles() {
        let (engine, works) = engine_with_works();
        assert_eq!(engine.handles().unwrap(), vec![works.clone()]);
        engine.delete(&works).unwrap();
        assert!(matches!(engine.delete(&works), Err(ValcheckError::HandleNotFound { .. })));
        assert!(engine.handles().unwrap().is_empty());
    }

    #[test]
    fn test_open_from_geojson_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MemoryEngine::new();
        let (source, _) = engine_with_works();
        let handle = source.open(Path::new("works")).unwrap();
        source.export(&handle, &dir.path().join("WORKS.geojson")).unwrap();

        let bare = dir.path().join("WORKS");
        assert!(engine.exists(&bare));
        let opened = engine.open(&bare).unwrap();
        assert_eq!(engine.count(&opened).unwrap(), 2);
    }
}
