use chrono::NaiveDate;
use std::collections::BTreeMap;
use valcheck_core::models::{AttributeValue, Theme, ValueResult};

pub(crate) fn sample_result(theme: Theme) -> ValueResult {
    ValueResult {
        work_id: "W1".to_string(),
        work_name: "Track upgrade".to_string(),
        work_description: String::new(),
        district: "Tambo".to_string(),
        risk_level: "DAP".to_string(),
        sensitivity: None,
        theme,
        dataset: "watercourse".to_string(),
        value_type: "Watercourse".to_string(),
        buffer: "50m".to_string(),
        value: AttributeValue::text("Creek A"),
        value_description: None,
        value_id: None,
        x: 10.0,
        y: 20.0,
        area_ha: None,
        length_km: Some(0.2),
        date_checked: NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
        extra: BTreeMap::new(),
        mitigation: None,
        qbid: None,
        qbid_alt: None,
    }
}
