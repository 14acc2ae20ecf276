use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map of a single feature, keyed by field name
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Typed attribute value as read from a values or works layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// Convert a JSON property into an attribute value.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
            other => AttributeValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        AttributeValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Null, empty (or whitespace-only) text, and numeric zero count as blank
    pub fn is_blank(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Bool(_) => false,
            AttributeValue::Integer(i) => *i == 0,
            AttributeValue::Float(f) => *f == 0.0,
            AttributeValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// String form used for concatenation; null renders as an empty string
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Stable key used to group rows by attribute tuple
    pub fn group_key(&self) -> String {
        match self {
            AttributeValue::Null => "n".to_string(),
            AttributeValue::Bool(b) => format!("b:{}", b),
            AttributeValue::Integer(i) => format!("i:{}", i),
            AttributeValue::Float(f) => format!("f:{}", f.to_bits()),
            AttributeValue::Text(s) => format!("t:{}", s),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_values() {
        assert!(AttributeValue::Null.is_blank());
        assert!(AttributeValue::text("").is_blank());
        assert!(AttributeValue::Integer(0).is_blank());
        assert!(AttributeValue::Float(0.0).is_blank());
        assert!(!AttributeValue::text("Creek A").is_blank());
        assert!(!AttributeValue::Integer(7).is_blank());
    }

    #[test]
    fn test_from_json() {
        assert_eq!(AttributeValue::from_json(&json!(42)), AttributeValue::Integer(42));
        assert_eq!(AttributeValue::from_json(&json!(1.5)), AttributeValue::Float(1.5));
        assert_eq!(AttributeValue::from_json(&json!("SPZ")), AttributeValue::text("SPZ"));
        assert_eq!(AttributeValue::from_json(&json!(null)), AttributeValue::Null);
    }

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(AttributeValue::Null.as_text(), "");
        assert_eq!(AttributeValue::Integer(500002).as_text(), "500002");
    }

    #[test]
    fn test_untagged_serde() {
        let value: AttributeValue = serde_json::from_str("null").unwrap();
        assert!(value.is_null());
        let value: AttributeValue = serde_json::from_str("\"Koala\"").unwrap();
        assert_eq!(value, AttributeValue::text("Koala"));
    }

    #[test]
    fn test_group_key_distinguishes_types() {
        assert_ne!(AttributeValue::Integer(1).group_key(), AttributeValue::text("1").group_key());
    }
}
