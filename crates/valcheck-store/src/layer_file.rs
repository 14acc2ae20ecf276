//! GeoJSON layer files

use crate::memory::{FeatureRecord, Layer};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use std::fs;
use std::path::Path;
use valcheck_core::models::{AttributeValue, Attributes, Geometry};
use valcheck_core::{Result, ValcheckError};

fn parse_error(path: &Path, reason: impl std::fmt::Display) -> ValcheckError {
    ValcheckError::Serialization(format!("Failed to parse GeoJSON {}: {}", path.display(), reason))
}

/// Read a GeoJSON file as a layer.
///
/// Field order follows first appearance across features. Features without a
/// usable geometry are dropped with a warning.
pub fn read_layer(path: &Path) -> Result<Layer> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse().map_err(|e| parse_error(path, e))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    let mut fields: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(features.len());

    for (idx, feature) in features.into_iter().enumerate() {
        let attributes: Attributes = feature
            .properties
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
            .collect();

        if let Some(props) = &feature.properties {
            for key in props.keys() {
                if !fields.contains(key) {
                    fields.push(key.clone());
                }
            }
        }

        let geometry = feature
            .geometry
            .as_ref()
            .and_then(|g| serde_json::to_value(g).ok())
            .and_then(|v| Geometry::from_geojson(&v));

        match geometry {
            Some(geometry) => records.push(FeatureRecord { attributes, geometry }),
            None => tracing::warn!(
                "Dropping feature {} of {}: missing or unsupported geometry",
                idx,
                path.display()
            ),
        }
    }

    Ok(Layer::new(fields, records))
}

/// Write a layer as a GeoJSON feature collection
pub fn write_layer(layer: &Layer, path: &Path) -> Result<()> {
    let mut features = Vec::with_capacity(layer.len());
    for record in layer.features() {
        let geometry = geojson::Geometry::from_json_value(record.geometry.to_geojson()?)
            .map_err(|e| ValcheckError::Serialization(e.to_string()))?;

        let properties: JsonObject = layer
            .fields()
            .iter()
            .map(|f| {
                let value = record.attributes.get(f).map(AttributeValue::to_json);
                (f.clone(), value.unwrap_or(serde_json::Value::Null))
            })
            .collect();

        features.push(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    let content = serde_json::to_string_pretty(&collection)
        .map_err(|e| ValcheckError::Serialization(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}
