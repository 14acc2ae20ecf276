//! Canonical geometry and distance types shared by every valcheck crate.
//!
//! `Geometry` is GeoJSON-shaped so layers can be read from and written to
//! GeoJSON without a separate intermediate model; computational work happens
//! on `geo` types inside `valcheck-geo`.

use crate::error::{Result, ValcheckError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance units accepted in buffer catalogue entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Feet,
}

impl DistanceUnit {
    /// Convert a distance value to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            DistanceUnit::Meters => value,
            DistanceUnit::Kilometers => value * 1000.0,
            DistanceUnit::Feet => value * 0.3048,
        }
    }

    fn label(&self, value: f64) -> &'static str {
        let singular = (value - 1.0).abs() < f64::EPSILON;
        match (self, singular) {
            (DistanceUnit::Meters, true) => "meter",
            (DistanceUnit::Meters, false) => "meters",
            (DistanceUnit::Kilometers, true) => "kilometer",
            (DistanceUnit::Kilometers, false) => "kilometers",
            (DistanceUnit::Feet, true) => "foot",
            (DistanceUnit::Feet, false) => "feet",
        }
    }
}

/// Parse distance unit from string
pub fn parse_distance_unit(s: &str) -> Result<DistanceUnit> {
    match s.trim().to_lowercase().as_str() {
        "meters" | "meter" | "metres" | "metre" | "m" => Ok(DistanceUnit::Meters),
        "kilometers" | "kilometer" | "kilometres" | "kilometre" | "km" => {
            Ok(DistanceUnit::Kilometers)
        }
        "feet" | "foot" | "ft" => Ok(DistanceUnit::Feet),
        other => Err(ValcheckError::ConfigInvalid {
            key: "distance_unit".to_string(),
            reason: format!("Invalid distance unit: {}. Use meters, kilometers, or feet", other),
        }),
    }
}

/// Distance with unit, written in catalogues as e.g. `"500 meters"`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    /// Create a new distance
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    /// Create distance in meters
    pub fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    /// Convert to meters
    pub fn to_meters(&self) -> f64 {
        self.unit.to_meters(self.value)
    }
}

impl FromStr for Distance {
    type Err = ValcheckError;

    /// Accepts `"500 meters"`, `"1 meter"`, `"0.5 km"` and the compact `"50m"`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);

        let value: f64 = number.parse().map_err(|_| ValcheckError::ConfigInvalid {
            key: "distance".to_string(),
            reason: format!("'{}' does not start with a number", s),
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(ValcheckError::ConfigInvalid {
                key: "distance".to_string(),
                reason: format!("'{}' must be a positive distance", s),
            });
        }

        let unit = if unit.trim().is_empty() {
            DistanceUnit::Meters
        } else {
            parse_distance_unit(unit)?
        };

        Ok(Distance::new(value, unit))
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.label(self.value))
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GeometryType {
    #[default]
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    /// Topological dimension: 0 for points, 1 for lines, 2 for polygons
    pub fn dimension(&self) -> u8 {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => 0,
            GeometryType::LineString | GeometryType::MultiLineString => 1,
            GeometryType::Polygon | GeometryType::MultiPolygon => 2,
        }
    }
}

/// GeoJSON-compatible geometry representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPoint { coordinates: Vec<[f64; 2]> },
    MultiLineString { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Axis-aligned square polygon, handy for fixtures and extents
    pub fn square(min_x: f64, min_y: f64, size: f64) -> Self {
        let (max_x, max_y) = (min_x + size, min_y + size);
        Geometry::polygon(vec![vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]])
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
        }
    }

    /// Parse from a GeoJSON geometry object
    pub fn from_geojson(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Serialize to a GeoJSON geometry object
    pub fn to_geojson(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ValcheckError::Serialization(e.to_string()))
    }
}

/// Derived geometry fields of a feature.
///
/// `x`/`y` is the representative point: centroid for polygons, midpoint for
/// lines, native coordinates for points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurements {
    pub x: f64,
    pub y: f64,
    pub area_ha: Option<f64>,
    pub length_km: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalogue_distances() {
        let d: Distance = "500 meters".parse().unwrap();
        assert_eq!(d, Distance::meters(500.0));

        let d: Distance = "1 meter".parse().unwrap();
        assert_eq!(d.to_meters(), 1.0);

        let d: Distance = "50m".parse().unwrap();
        assert_eq!(d.to_meters(), 50.0);

        let d: Distance = "0.5 km".parse().unwrap();
        assert!((d.to_meters() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_reject_bad_distances() {
        assert!("meters".parse::<Distance>().is_err());
        assert!("-5 meters".parse::<Distance>().is_err());
        assert!("10 furlongs".parse::<Distance>().is_err());
    }

    #[test]
    fn test_distance_display() {
        assert_eq!(Distance::meters(1.0).to_string(), "1 meter");
        assert_eq!(Distance::meters(500.0).to_string(), "500 meters");
    }

    #[test]
    fn test_geometry_geojson_shape() {
        let point = Geometry::point(2450000.0, 2400000.0);
        let json = point.to_geojson().unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(Geometry::from_geojson(&json), Some(point));
    }

    #[test]
    fn test_dimension() {
        assert_eq!(Geometry::square(0.0, 0.0, 1.0).geometry_type().dimension(), 2);
        assert_eq!(GeometryType::MultiLineString.dimension(), 1);
        assert_eq!(GeometryType::Point.dimension(), 0);
    }
}
