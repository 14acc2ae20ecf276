//! Integration tests for dataset matrix resolution

use proptest::prelude::*;
use std::collections::BTreeMap;
use valcheck_core::models::{
    BufferSelection, Mode, RawBuffer, RawDatasetEntry, RawModeBuffer, Theme, ValueField,
};
use valcheck_core::{DatasetMatrix, ValcheckError};

fn field_name() -> impl Strategy<Value = String> {
    "[A-Z]{2,8}"
}

fn entry(fields: Vec<String>, value_field: Option<ValueField>) -> RawDatasetEntry {
    RawDatasetEntry {
        name: Some("generated".to_string()),
        path: Some("{csdl}/GENERATED".to_string()),
        fields: Some(fields),
        value_type: Some("Generated".to_string()),
        value_field,
        ..Default::default()
    }
}

proptest! {
    /// Every resolved spec maps its value fields onto configured fields only.
    #[test]
    fn prop_value_fields_subset_of_fields(
        fields in prop::collection::btree_set(field_name(), 1..6),
        picks in prop::collection::vec(field_name(), 1..4),
    ) {
        let fields: Vec<String> = fields.into_iter().collect();
        let value_field = if picks.len() == 1 {
            ValueField::Single(picks[0].clone())
        } else {
            ValueField::Concat(picks.clone())
        };

        match entry(fields.clone(), Some(value_field)).resolve(&Theme::Forests) {
            Ok(spec) => {
                let names = spec.value_field.as_ref().map(|v| v.names()).unwrap_or_default();
                for name in names {
                    prop_assert!(fields.iter().any(|f| f == name));
                }
            }
            Err(e) => {
                let is_config = matches!(e, ValcheckError::DatasetConfig { .. });
                prop_assert!(is_config, "unexpected error {}", e);
                prop_assert!(picks.iter().any(|p| !fields.contains(p)));
            }
        }
    }

    /// A single buffer class name resolves to a fixed selection for every mode.
    #[test]
    fn prop_single_buffer_is_fixed(class in "[0-9]{1,4}m") {
        let mut raw = entry(vec!["NAME".to_string()], None);
        raw.buffer = Some(RawBuffer::Single(class.clone()));
        let spec = raw.resolve(&Theme::Water).unwrap();
        prop_assert_eq!(spec.buffer, BufferSelection::Fixed(class));
    }
}

#[test]
fn test_mode_map_keeps_declared_modes_only() {
    let mut raw = entry(vec!["NAME".to_string()], None);
    let mut map = BTreeMap::new();
    map.insert("DAP".to_string(), RawModeBuffer::One("1m".to_string()));
    raw.buffer = Some(RawBuffer::PerMode(map));

    let spec = raw.resolve(&Theme::Forests).unwrap();
    match spec.buffer {
        BufferSelection::PerMode(map) => {
            assert!(map.contains_key(&Mode::Dap));
            assert!(!map.contains_key(&Mode::Jfmp));
        }
        other => panic!("unexpected selection {:?}", other),
    }
}

#[test]
fn test_builtin_matrix_paths_use_known_aliases() {
    let matrix = DatasetMatrix::builtin().unwrap();
    let aliases = valcheck_core::config::LayeredConfig::with_defaults().path_aliases.value;

    for theme in matrix.themes() {
        for dataset in &theme.datasets {
            assert!(
                dataset.resolve_path(&aliases).is_ok(),
                "{}/{} uses an unknown alias",
                theme.theme,
                dataset.name
            );
        }
    }
}

#[test]
fn test_load_matrix_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("matrix.toml");
    std::fs::write(
        &path,
        r#"
[[buffers]]
name = "50m"
distance = "50 meters"

[[themes]]
name = "water"

[[themes.datasets]]
name = "creeks"
path = "{regional}/CREEKS"
buffer = "50m"
fields = ["NAME"]
value_type = "Watercourse"
value_field = "NAME"
high_risk_only = true
"#,
    )
    .unwrap();

    let matrix = DatasetMatrix::load(&path).unwrap();
    let water = matrix.datasets_for(&Theme::Water).unwrap();
    assert_eq!(water.len(), 1);
    assert!(water[0].high_risk_only);
    assert!(matrix.datasets_for(&Theme::Heritage).is_none());
}
