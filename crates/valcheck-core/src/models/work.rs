use crate::models::attribute::{AttributeValue, Attributes};
use crate::models::geometry::{Geometry, Measurements};
use serde::{Deserialize, Serialize};

/// Names of the standard attributes on the works layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkFields {
    pub id: String,
    pub name: String,
    pub description: String,
    pub district: String,
    pub risk: String,
    pub sensitivity: String,
}

impl Default for WorkFields {
    fn default() -> Self {
        Self {
            id: "DAP_REF_NO".to_string(),
            name: "DAP_NAME".to_string(),
            description: "DESCRIPTION".to_string(),
            district: "DISTRICT".to_string(),
            risk: "RISK_LVL".to_string(),
            sensitivity: "CH_SENS".to_string(),
        }
    }
}

impl WorkFields {
    /// Work attributes carried through every overlay, in report order
    pub fn carried(&self) -> [&str; 6] {
        [
            self.id.as_str(),
            self.name.as_str(),
            self.description.as_str(),
            self.district.as_str(),
            self.risk.as_str(),
            self.sensitivity.as_str(),
        ]
    }
}

/// One prepared unit of proposed works
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkFeature {
    #[serde(rename = "UNIQUE_ID")]
    pub id: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "DESCRIPTION")]
    pub description: String,
    #[serde(rename = "DISTRICT")]
    pub district: String,
    #[serde(rename = "RISK_LVL")]
    pub risk_level: String,
    #[serde(rename = "CH_SENS", skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,
    #[serde(rename = "Easting")]
    pub easting: i64,
    #[serde(rename = "Northing")]
    pub northing: i64,
    #[serde(rename = "AREA_HA", skip_serializing_if = "Option::is_none")]
    pub area_ha: Option<f64>,
    #[serde(rename = "LENGTH_KM", skip_serializing_if = "Option::is_none")]
    pub length_km: Option<f64>,
    #[serde(skip)]
    pub geometry: Option<Geometry>,
}

impl WorkFeature {
    /// Build from a works-layer row; rows without an identifier yield `None`
    pub fn from_row(
        fields: &WorkFields,
        attributes: &Attributes,
        geometry: Option<Geometry>,
        measure: &Measurements,
    ) -> Option<Self> {
        let text = |name: &str| attributes.get(name).map(AttributeValue::as_text).unwrap_or_default();

        let id = text(&fields.id);
        if id.trim().is_empty() {
            return None;
        }

        Some(Self {
            id,
            name: text(&fields.name),
            description: text(&fields.description),
            district: text(&fields.district),
            risk_level: text(&fields.risk),
            sensitivity: attributes
                .get(&fields.sensitivity)
                .filter(|v| !v.is_blank())
                .map(AttributeValue::as_text),
            easting: measure.x.trunc() as i64,
            northing: measure.y.trunc() as i64,
            area_ha: measure.area_ha,
            length_km: measure.length_km,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("DAP_REF_NO".to_string(), AttributeValue::text(id));
        attributes.insert("DAP_NAME".to_string(), AttributeValue::text("Track upgrade"));
        attributes.insert("RISK_LVL".to_string(), AttributeValue::text("DAP"));
        attributes
    }

    #[test]
    fn test_from_row() {
        let measure = Measurements { x: 2450123.9, y: 2400456.2, area_ha: Some(1.5), length_km: None };
        let work = WorkFeature::from_row(&WorkFields::default(), &row("W1"), None, &measure).unwrap();
        assert_eq!(work.id, "W1");
        assert_eq!(work.easting, 2450123);
        assert_eq!(work.northing, 2400456);
        assert_eq!(work.district, "");
        assert!(work.sensitivity.is_none());
    }

    #[test]
    fn test_blank_id_dropped() {
        let measure = Measurements::default();
        assert!(WorkFeature::from_row(&WorkFields::default(), &row("  "), None, &measure).is_none());
    }

    #[test]
    fn test_detail_columns() {
        let measure = Measurements::default();
        let work = WorkFeature::from_row(&WorkFields::default(), &row("W2"), None, &measure).unwrap();
        let json = serde_json::to_value(&work).unwrap();
        assert_eq!(json["UNIQUE_ID"], "W2");
        assert!(json.get("LENGTH_KM").is_none());
    }
}
