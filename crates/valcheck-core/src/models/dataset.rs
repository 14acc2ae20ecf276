//! Dataset matrix entries and their resolution into canonical specs.

use crate::error::{Result, ValcheckError};
use crate::models::mode::Mode;
use crate::models::result::REPORT_COLUMNS;
use crate::models::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Buffer class applied when a matrix entry names none
pub const DEFAULT_BUFFER: &str = "1m";

/// Named placeholders substituted into dataset path templates
pub type PathAliases = BTreeMap<String, String>;

/// Buffer policy of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSelection {
    /// One class for every mode
    Fixed(String),
    /// One class per mode
    PerMode(BTreeMap<Mode, String>),
    /// One or more classes per mode, one overlay pass each
    PerModeMulti(BTreeMap<Mode, Vec<String>>),
}

impl BufferSelection {
    /// Every buffer class this selection can reference
    pub fn referenced_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = match self {
            BufferSelection::Fixed(name) => vec![name.as_str()],
            BufferSelection::PerMode(map) => map.values().map(String::as_str).collect(),
            BufferSelection::PerModeMulti(map) => {
                map.values().flatten().map(String::as_str).collect()
            }
        };
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}

/// Attribute(s) that make up the reported `Value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueField {
    Single(String),
    Concat(Vec<String>),
}

impl ValueField {
    pub const SEPARATOR: &'static str = ", ";

    pub fn names(&self) -> Vec<&str> {
        match self {
            ValueField::Single(name) => vec![name.as_str()],
            ValueField::Concat(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Canonical, validated matrix entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub theme: Theme,
    pub name: String,
    pub path_template: String,
    pub fields: Vec<String>,
    pub value_type: String,
    pub value_field: Option<ValueField>,
    pub description_field: Option<String>,
    pub id_field: Option<String>,
    pub where_clause: Option<String>,
    pub buffer: BufferSelection,
    /// Empty means every mode
    pub modes: Vec<Mode>,
    pub high_risk_only: bool,
    /// Report column names for dataset fields, keyed by field
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl DatasetSpec {
    /// Substitute `{alias}` placeholders in the path template
    pub fn resolve_path(&self, aliases: &PathAliases) -> Result<String> {
        resolve_template(&self.path_template, aliases)
    }

    /// Fields named by the value, description and id mappings
    pub fn mapped_fields(&self) -> Vec<&str> {
        let mut mapped: Vec<&str> =
            self.value_field.as_ref().map(|v| v.names()).unwrap_or_default();
        mapped.extend(self.description_field.as_deref());
        mapped.extend(self.id_field.as_deref());
        mapped
    }

    /// `(field, report column)` pairs copied into a result's extras, in
    /// field order: unmapped fields under their own name, and every renamed
    /// field under its new name
    pub fn extra_columns(&self) -> Vec<(&str, &str)> {
        let mapped = self.mapped_fields();
        self.fields
            .iter()
            .filter_map(|field| match self.columns.get(field) {
                Some(column) => Some((field.as_str(), column.as_str())),
                None if mapped.contains(&field.as_str()) => None,
                None => Some((field.as_str(), field.as_str())),
            })
            .collect()
    }
}

/// Substitute `{alias}` placeholders in a template
pub fn resolve_template(template: &str, aliases: &PathAliases) -> Result<String> {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| ValcheckError::ConfigInvalid {
            key: "path_template".to_string(),
            reason: format!("unclosed placeholder in '{}'", template),
        })?;
        let alias = &after[..end];
        let target = aliases.get(alias).ok_or_else(|| ValcheckError::UnknownPathAlias {
            alias: alias.to_string(),
            template: template.to_string(),
        })?;
        resolved.push_str(target);
        rest = &after[end + 1..];
    }
    resolved.push_str(rest);

    Ok(resolved)
}

/// Buffer value as written in the matrix: a class name or a mode map
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawBuffer {
    Single(String),
    PerMode(BTreeMap<String, RawModeBuffer>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawModeBuffer {
    One(String),
    Many(Vec<String>),
}

/// Matrix entry as written in the matrix file; every key is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDatasetEntry {
    pub name: Option<String>,
    pub path: Option<String>,
    pub fields: Option<Vec<String>>,
    pub value_type: Option<String>,
    pub value_field: Option<ValueField>,
    pub description_field: Option<String>,
    pub id_field: Option<String>,
    pub where_clause: Option<String>,
    pub buffer: Option<RawBuffer>,
    pub modes: Option<Vec<String>>,
    pub high_risk_only: Option<bool>,
    pub columns: Option<BTreeMap<String, String>>,
}

impl RawDatasetEntry {
    /// Resolve into a canonical spec, filling defaults.
    ///
    /// Errors are per dataset and never fatal to a job.
    pub fn resolve(self, theme: &Theme) -> Result<DatasetSpec> {
        let name = self.name.clone().unwrap_or_default();
        let fail = |reason: String| ValcheckError::DatasetConfig {
            theme: theme.to_string(),
            dataset: if name.is_empty() { "<unnamed>".to_string() } else { name.clone() },
            reason,
        };

        if name.trim().is_empty() {
            return Err(fail("missing required key 'name'".to_string()));
        }
        let path_template = self
            .path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| fail("missing required key 'path'".to_string()))?;
        let fields = self
            .fields
            .filter(|f| !f.is_empty())
            .ok_or_else(|| fail("missing required key 'fields'".to_string()))?;
        let value_type = self
            .value_type
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| fail("missing required key 'value_type'".to_string()))?;

        let mut unique = HashSet::new();
        if let Some(duplicate) = fields.iter().find(|f| !unique.insert(f.as_str())) {
            return Err(fail(format!("field '{}' is listed twice", duplicate)));
        }

        if let Some(ValueField::Concat(names)) = &self.value_field {
            if names.is_empty() {
                return Err(fail("value_field list is empty".to_string()));
            }
        }
        let mapped = self
            .value_field
            .iter()
            .flat_map(|v| v.names())
            .map(|n| ("value_field", n))
            .chain(self.description_field.as_deref().map(|n| ("description_field", n)))
            .chain(self.id_field.as_deref().map(|n| ("id_field", n)));
        for (key, field) in mapped {
            if !fields.iter().any(|f| f == field) {
                return Err(fail(format!("{} '{}' is not in fields", key, field)));
            }
        }

        let modes = self
            .modes
            .unwrap_or_default()
            .iter()
            .map(|m| m.parse::<Mode>())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| fail(e.to_string()))?;

        let buffer = match self.buffer {
            None => BufferSelection::Fixed(DEFAULT_BUFFER.to_string()),
            Some(raw) => resolve_buffer(raw).map_err(fail)?,
        };

        let where_clause = self.where_clause.filter(|w| !w.trim().is_empty());
        let columns = self.columns.unwrap_or_default();

        let spec = DatasetSpec {
            theme: theme.clone(),
            name: name.clone(),
            path_template,
            fields,
            value_type,
            value_field: self.value_field,
            description_field: self.description_field,
            id_field: self.id_field,
            where_clause,
            buffer,
            modes,
            high_risk_only: self.high_risk_only.unwrap_or(false),
            columns,
        };

        if let Some(field) = spec.columns.keys().find(|k| !spec.fields.contains(k)) {
            return Err(fail(format!("column rename for '{}' which is not in fields", field)));
        }
        let mut seen = HashSet::new();
        for (field, column) in spec.extra_columns() {
            if REPORT_COLUMNS.contains(&column) {
                return Err(fail(format!(
                    "field '{}' would overwrite report column '{}'; rename it under columns",
                    field, column
                )));
            }
            if !seen.insert(column) {
                return Err(fail(format!("report column '{}' is produced twice", column)));
            }
        }

        Ok(spec)
    }
}

fn resolve_buffer(raw: RawBuffer) -> std::result::Result<BufferSelection, String> {
    match raw {
        RawBuffer::Single(name) if name.trim().is_empty() => {
            Err("buffer class name is empty".to_string())
        }
        RawBuffer::Single(name) => Ok(BufferSelection::Fixed(name)),
        RawBuffer::PerMode(map) => {
            if map.is_empty() {
                return Err("buffer mode map is empty".to_string());
            }
            let multi = map.values().any(|v| matches!(v, RawModeBuffer::Many(_)));
            let mut single = BTreeMap::new();
            let mut many = BTreeMap::new();

            for (key, value) in map {
                let mode: Mode = key.parse().map_err(|e: ValcheckError| e.to_string())?;
                let classes = match value {
                    RawModeBuffer::One(name) => vec![name],
                    RawModeBuffer::Many(names) => names,
                };
                if classes.is_empty() || classes.iter().any(|c| c.trim().is_empty()) {
                    return Err(format!("buffer classes for mode {} are empty", mode));
                }
                if multi {
                    many.insert(mode, classes);
                } else if let Some(name) = classes.into_iter().next() {
                    single.insert(mode, name);
                }
            }

            Ok(if multi {
                BufferSelection::PerModeMulti(many)
            } else {
                BufferSelection::PerMode(single)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watercourse() -> RawDatasetEntry {
        RawDatasetEntry {
            name: Some("watercourse".to_string()),
            path: Some("{csdl}/VMHYDRO/HY_WATERCOURSE".to_string()),
            fields: Some(vec!["NAME".to_string(), "FEATURE_TYPE_CODE".to_string()]),
            value_type: Some("Watercourse".to_string()),
            value_field: Some(ValueField::Single("NAME".to_string())),
            description_field: Some("FEATURE_TYPE_CODE".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let spec = watercourse().resolve(&Theme::Water).unwrap();
        assert_eq!(spec.buffer, BufferSelection::Fixed("1m".to_string()));
        assert!(spec.where_clause.is_none());
        assert!(!spec.high_risk_only);
        assert!(spec.modes.is_empty());
        assert!(spec.id_field.is_none());
    }

    #[test]
    fn test_missing_required_keys() {
        for strip in ["path", "fields", "value_type"] {
            let mut raw = watercourse();
            match strip {
                "path" => raw.path = None,
                "fields" => raw.fields = None,
                _ => raw.value_type = None,
            }
            let err = raw.resolve(&Theme::Water).unwrap_err();
            assert!(err.to_string().contains(strip), "{}", err);
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_value_field_outside_fields_rejected() {
        let mut raw = watercourse();
        raw.value_field = Some(ValueField::Concat(vec!["NAME".to_string(), "GNR".to_string()]));
        assert!(matches!(
            raw.resolve(&Theme::Water),
            Err(ValcheckError::DatasetConfig { .. })
        ));
    }

    #[test]
    fn test_extra_columns_follow_renames() {
        let mut raw = watercourse();
        raw.fields = Some(vec![
            "NAME".to_string(),
            "FEATURE_TYPE_CODE".to_string(),
            "GNR".to_string(),
        ]);
        raw.columns = Some(BTreeMap::from([("NAME".to_string(), "WATERCOURSE_NAME".to_string())]));
        let spec = raw.resolve(&Theme::Water).unwrap();
        assert_eq!(spec.extra_columns(), vec![("NAME", "WATERCOURSE_NAME"), ("GNR", "GNR")]);
    }

    #[test]
    fn test_extra_field_named_like_report_column_rejected() {
        let mut raw = watercourse();
        raw.fields = Some(vec![
            "NAME".to_string(),
            "FEATURE_TYPE_CODE".to_string(),
            "Buffer".to_string(),
        ]);
        let err = raw.resolve(&Theme::Water).unwrap_err();
        assert!(err.to_string().contains("'Buffer'"), "{}", err);

        let mut renamed = watercourse();
        renamed.fields = Some(vec![
            "NAME".to_string(),
            "FEATURE_TYPE_CODE".to_string(),
            "Buffer".to_string(),
        ]);
        renamed.columns = Some(BTreeMap::from([("Buffer".to_string(), "SOURCE_BUFFER".to_string())]));
        assert!(renamed.resolve(&Theme::Water).is_ok());
    }

    #[test]
    fn test_rename_onto_report_column_rejected() {
        let mut raw = watercourse();
        raw.columns = Some(BTreeMap::from([("NAME".to_string(), "DISTRICT".to_string())]));
        assert!(matches!(
            raw.resolve(&Theme::Water),
            Err(ValcheckError::DatasetConfig { .. })
        ));

        let mut unknown = watercourse();
        unknown.columns = Some(BTreeMap::from([("GNR".to_string(), "GNR_CODE".to_string())]));
        assert!(unknown.resolve(&Theme::Water).is_err());
    }

    #[test]
    fn test_mode_map_buffers() {
        let mut raw = watercourse();
        let mut map = BTreeMap::new();
        map.insert("DAP".to_string(), RawModeBuffer::One("1m".to_string()));
        map.insert("JFMP".to_string(), RawModeBuffer::One("50m".to_string()));
        raw.buffer = Some(RawBuffer::PerMode(map));
        let spec = raw.resolve(&Theme::Water).unwrap();
        match spec.buffer {
            BufferSelection::PerMode(map) => assert_eq!(map[&Mode::Jfmp], "50m"),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn test_mixed_mode_map_promotes_to_multi() {
        let mut raw = watercourse();
        let mut map = BTreeMap::new();
        map.insert("DAP".to_string(), RawModeBuffer::One("500m".to_string()));
        map.insert(
            "JFMP".to_string(),
            RawModeBuffer::Many(vec!["500m".to_string(), "1000m_ring".to_string()]),
        );
        raw.buffer = Some(RawBuffer::PerMode(map));
        let spec = raw.resolve(&Theme::Water).unwrap();
        assert_eq!(spec.buffer.referenced_classes(), vec!["1000m_ring", "500m"]);
        assert!(matches!(spec.buffer, BufferSelection::PerModeMulti(_)));
    }

    #[test]
    fn test_bad_mode_name_rejected() {
        let mut raw = watercourse();
        raw.modes = Some(vec!["DAP".to_string(), "BURN".to_string()]);
        assert!(raw.resolve(&Theme::Water).is_err());
    }

    #[test]
    fn test_resolve_template() {
        let mut aliases = PathAliases::new();
        aliases.insert("csdl".to_string(), "/data/csdl".to_string());
        assert_eq!(
            resolve_template("{csdl}/FORESTS/FMZ100", &aliases).unwrap(),
            "/data/csdl/FORESTS/FMZ100"
        );
        assert!(matches!(
            resolve_template("{regional}/SITES", &aliases),
            Err(ValcheckError::UnknownPathAlias { .. })
        ));
        assert!(resolve_template("{csdl/FMZ", &aliases).is_err());
    }
}
