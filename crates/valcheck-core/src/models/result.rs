use crate::models::attribute::AttributeValue;
use crate::models::theme::Theme;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder written when a configured field cannot be read from a row
pub const FIELD_NOT_FOUND: &str = "field not found";

/// Fixed report columns; dataset extras may not reuse these names
pub const REPORT_COLUMNS: [&str; 21] = [
    "UNIQUE_ID",
    "NAME",
    "DESCRIPTION",
    "DISTRICT",
    "RISK_LVL",
    "CH_SENS",
    "theme",
    "dataset",
    "Value_Type",
    "Buffer",
    "Value",
    "Value_Description",
    "Value_ID",
    "X",
    "Y",
    "AREA_HA",
    "LENGTH_KM",
    "DATE_CHECKED",
    "mitigation",
    "QBID",
    "QBID_Alt",
];

/// One value occurrence found against one work, after dissolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueResult {
    #[serde(rename = "UNIQUE_ID")]
    pub work_id: String,
    #[serde(rename = "NAME")]
    pub work_name: String,
    #[serde(rename = "DESCRIPTION")]
    pub work_description: String,
    #[serde(rename = "DISTRICT")]
    pub district: String,
    #[serde(rename = "RISK_LVL")]
    pub risk_level: String,
    #[serde(rename = "CH_SENS", default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,
    pub theme: Theme,
    pub dataset: String,
    #[serde(rename = "Value_Type")]
    pub value_type: String,
    #[serde(rename = "Buffer")]
    pub buffer: String,
    #[serde(rename = "Value")]
    pub value: AttributeValue,
    #[serde(rename = "Value_Description", default)]
    pub value_description: Option<AttributeValue>,
    #[serde(rename = "Value_ID", default)]
    pub value_id: Option<AttributeValue>,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "AREA_HA", default, skip_serializing_if = "Option::is_none")]
    pub area_ha: Option<f64>,
    #[serde(rename = "LENGTH_KM", default, skip_serializing_if = "Option::is_none")]
    pub length_km: Option<f64>,
    #[serde(rename = "DATE_CHECKED")]
    pub date_checked: NaiveDate,
    /// Configured dataset fields not consumed by the value mappings, plus
    /// renamed columns, keyed by report column
    #[serde(flatten)]
    pub extra: BTreeMap<String, AttributeValue>,
    pub mitigation: Option<String>,
    #[serde(rename = "QBID")]
    pub qbid: Option<String>,
    #[serde(rename = "QBID_Alt")]
    pub qbid_alt: Option<String>,
}

impl ValueResult {
    /// Look up a column by its report name.
    ///
    /// Returns `None` only for names that are neither a standard column nor a
    /// retained extra field; absent optional columns read as `Null`.
    pub fn field(&self, name: &str) -> Option<AttributeValue> {
        fn text(s: &str) -> AttributeValue {
            AttributeValue::text(s)
        }
        let optional = |v: &Option<AttributeValue>| v.clone().unwrap_or_default();
        let number = |v: Option<f64>| v.map(AttributeValue::Float).unwrap_or_default();

        let value = match name {
            "UNIQUE_ID" => text(&self.work_id),
            "NAME" => text(&self.work_name),
            "DESCRIPTION" => text(&self.work_description),
            "DISTRICT" => text(&self.district),
            "RISK_LVL" => text(&self.risk_level),
            "CH_SENS" => self.sensitivity.as_deref().map(text).unwrap_or_default(),
            "theme" => text(self.theme.as_str()),
            "dataset" => text(&self.dataset),
            "Value_Type" => text(&self.value_type),
            "Buffer" => text(&self.buffer),
            "Value" => self.value.clone(),
            "Value_Description" => optional(&self.value_description),
            "Value_ID" => optional(&self.value_id),
            "X" => AttributeValue::Float(self.x),
            "Y" => AttributeValue::Float(self.y),
            "AREA_HA" => number(self.area_ha),
            "LENGTH_KM" => number(self.length_km),
            "DATE_CHECKED" => text(&self.date_checked.format("%Y-%m-%d").to_string()),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }
}
