use crate::models::Geometry;
use valcheck_core::error::{Result, ValcheckError};

/// Validation result with details
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, location: String, reason: impl Into<String>) {
        self.errors.push(ValidationError { location, reason: reason.into() });
    }

    fn check_coords(&mut self, location: &str, coords: &[[f64; 2]]) {
        for (i, c) in coords.iter().enumerate() {
            if !c[0].is_finite() || !c[1].is_finite() {
                self.add_error(format!("{}[{}]", location, i), "Coordinates must be finite");
            }
        }
    }

    fn check_line(&mut self, location: &str, coords: &[[f64; 2]]) {
        if coords.len() < 2 {
            self.add_error(
                location.to_string(),
                format!("LineString must have at least 2 points, found {}", coords.len()),
            );
            return;
        }
        self.check_coords(location, coords);
    }

    fn check_polygon(&mut self, location: &str, rings: &[Vec<[f64; 2]>]) {
        if rings.is_empty() {
            self.add_error(location.to_string(), "Polygon has no exterior ring");
        }
        for (i, ring) in rings.iter().enumerate() {
            let ring_location = format!("{}.ring[{}]", location, i);
            if ring.len() < 4 {
                self.add_error(
                    ring_location,
                    format!("Ring must have at least 4 points, found {}", ring.len()),
                );
                continue;
            }
            if ring.first() != ring.last() {
                self.add_error(ring_location.clone(), "Ring is not closed");
            }
            self.check_coords(&ring_location, ring);
        }
    }
}

/// Validate a geometry
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    let mut result = ValidationResult::default();
    match geometry {
        Geometry::Point { coordinates } => {
            result.check_coords("Point", std::slice::from_ref(coordinates))
        }
        Geometry::MultiPoint { coordinates } => {
            if coordinates.is_empty() {
                result.add_error("MultiPoint".to_string(), "MultiPoint has no points");
            }
            result.check_coords("MultiPoint", coordinates)
        }
        Geometry::LineString { coordinates } => result.check_line("LineString", coordinates),
        Geometry::MultiLineString { coordinates } => {
            if coordinates.is_empty() {
                result.add_error("MultiLineString".to_string(), "MultiLineString has no parts");
            }
            for (i, line) in coordinates.iter().enumerate() {
                result.check_line(&format!("MultiLineString[{}]", i), line);
            }
        }
        Geometry::Polygon { coordinates } => result.check_polygon("Polygon", coordinates),
        Geometry::MultiPolygon { coordinates } => {
            if coordinates.is_empty() {
                result.add_error("MultiPolygon".to_string(), "MultiPolygon has no parts");
            }
            for (i, polygon) in coordinates.iter().enumerate() {
                result.check_polygon(&format!("MultiPolygon[{}]", i), polygon);
            }
        }
    }
    result
}

/// Fail with `InvalidGeometry` when a feature's geometry is not valid
pub fn ensure_valid(feature_id: &str, geometry: &Geometry) -> Result<()> {
    let result = validate_geometry(geometry);
    match result.errors.first() {
        None => Ok(()),
        Some(first) => Err(ValcheckError::InvalidGeometry {
            feature_id: feature_id.to_string(),
            reason: format!("{}: {}", first.location, first.reason),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_geometries() {
        assert!(validate_geometry(&Geometry::point(1.0, 2.0)).is_valid());
        assert!(validate_geometry(&Geometry::square(0.0, 0.0, 5.0)).is_valid());
        assert!(validate_geometry(&Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0]])).is_valid());
    }

    #[test]
    fn test_non_finite_point() {
        let result = validate_geometry(&Geometry::point(f64::NAN, 0.0));
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].location, "Point[0]");
    }

    #[test]
    fn test_short_line() {
        assert!(!validate_geometry(&Geometry::line_string(vec![[0.0, 0.0]])).is_valid());
    }

    #[test]
    fn test_unclosed_ring() {
        let open = Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        let result = validate_geometry(&open);
        assert!(result.errors.iter().any(|e| e.reason == "Ring is not closed"));
    }

    #[test]
    fn test_ensure_valid_names_feature() {
        let err = ensure_valid("W9", &Geometry::polygon(vec![])).unwrap_err();
        assert!(err.to_string().contains("W9"));
    }
}
