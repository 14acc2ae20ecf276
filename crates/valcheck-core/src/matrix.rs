//! Dataset matrix loading and validation.
//!
//! The matrix is data: a buffer catalogue, per-mode theme policy and the
//! datasets of each theme. Loading validates the catalogue (errors are
//! fatal) and resolves every dataset entry; entries that fail resolution are
//! kept aside as rejected so a job can still run the rest.

use crate::error::{Result, ValcheckError};
use crate::models::{
    BufferCatalogue, DatasetSpec, Mode, RawBufferEntry, RawDatasetEntry, Theme,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const BUILTIN_MATRIX: &str = include_str!("../data/matrix.toml");

#[derive(Debug, Deserialize)]
struct RawMatrix {
    #[serde(default)]
    buffers: Vec<RawBufferEntry>,
    #[serde(default)]
    modes: BTreeMap<String, RawModePolicy>,
    #[serde(default)]
    themes: Vec<RawTheme>,
}

#[derive(Debug, Deserialize)]
struct RawModePolicy {
    #[serde(default)]
    skip_themes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    name: String,
    #[serde(default)]
    datasets: Vec<RawDatasetEntry>,
}

/// Resolved datasets of one theme, in declaration order
#[derive(Debug, Clone, Serialize)]
pub struct ThemeDatasets {
    pub theme: Theme,
    pub datasets: Vec<DatasetSpec>,
}

/// A matrix entry that failed resolution
#[derive(Debug, Clone, Serialize)]
pub struct RejectedDataset {
    pub theme: Theme,
    pub dataset: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetMatrix {
    catalogue: BufferCatalogue,
    skip_themes: BTreeMap<Mode, Vec<Theme>>,
    themes: Vec<ThemeDatasets>,
    rejected: Vec<RejectedDataset>,
}

impl DatasetMatrix {
    /// The regional matrix shipped with valcheck
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_MATRIX)
    }

    /// Load a matrix file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ValcheckError::ConfigInvalid {
            key: "matrix".to_string(),
            reason: format!("Failed to read matrix file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawMatrix = toml::from_str(content).map_err(|e| ValcheckError::ConfigInvalid {
            key: "matrix".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })?;

        let catalogue = BufferCatalogue::from_raw(raw.buffers)?;

        let mut skip_themes = BTreeMap::new();
        for (mode, policy) in raw.modes {
            let mode: Mode = mode.parse()?;
            skip_themes.insert(mode, policy.skip_themes.into_iter().map(Theme::from).collect());
        }

        let mut seen_themes = HashSet::new();
        let mut themes = Vec::with_capacity(raw.themes.len());
        let mut rejected = Vec::new();

        for raw_theme in raw.themes {
            let theme = Theme::from(raw_theme.name);
            if !seen_themes.insert(theme.clone()) {
                return Err(ValcheckError::ConfigInvalid {
                    key: "matrix".to_string(),
                    reason: format!("theme '{}' is declared twice", theme),
                });
            }

            let mut names = HashSet::new();
            let mut datasets = Vec::with_capacity(raw_theme.datasets.len());

            for entry in raw_theme.datasets {
                let label = entry.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
                let resolved = entry
                    .resolve(&theme)
                    .and_then(|spec| check_buffer_classes(spec, &catalogue))
                    .and_then(|spec| {
                        if names.insert(spec.name.clone()) {
                            Ok(spec)
                        } else {
                            Err(ValcheckError::DatasetConfig {
                                theme: theme.to_string(),
                                dataset: spec.name,
                                reason: "dataset name is not unique within its theme".to_string(),
                            })
                        }
                    });

                match resolved {
                    Ok(spec) => datasets.push(spec),
                    Err(e) => {
                        tracing::warn!("Rejected dataset {}/{}: {}", theme, label, e);
                        rejected.push(RejectedDataset {
                            theme: theme.clone(),
                            dataset: label,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            themes.push(ThemeDatasets { theme, datasets });
        }

        Ok(Self { catalogue, skip_themes, themes, rejected })
    }

    pub fn catalogue(&self) -> &BufferCatalogue {
        &self.catalogue
    }

    pub fn themes(&self) -> &[ThemeDatasets] {
        &self.themes
    }

    /// Datasets of a theme, or `None` when the theme is not in the matrix
    pub fn datasets_for(&self, theme: &Theme) -> Option<&[DatasetSpec]> {
        self.themes.iter().find(|t| &t.theme == theme).map(|t| t.datasets.as_slice())
    }

    pub fn rejected(&self) -> &[RejectedDataset] {
        &self.rejected
    }

    /// Whether the mode policy skips a theme entirely
    pub fn skips_theme(&self, mode: Mode, theme: &Theme) -> bool {
        self.skip_themes.get(&mode).is_some_and(|skipped| skipped.contains(theme))
    }

    pub fn dataset_count(&self) -> usize {
        self.themes.iter().map(|t| t.datasets.len()).sum()
    }
}

fn check_buffer_classes(spec: DatasetSpec, catalogue: &BufferCatalogue) -> Result<DatasetSpec> {
    let unknown = spec
        .buffer
        .referenced_classes()
        .into_iter()
        .find(|class| !catalogue.contains(class))
        .map(str::to_string);

    match unknown {
        Some(buffer) => Err(ValcheckError::UnknownBufferClass { dataset: spec.name, buffer }),
        None => Ok(spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BufferSelection;

    #[test]
    fn test_builtin_matrix_resolves_cleanly() {
        let matrix = DatasetMatrix::builtin().unwrap();
        assert!(matrix.rejected().is_empty(), "{:?}", matrix.rejected());
        assert_eq!(matrix.catalogue().len(), 9);
        assert_eq!(matrix.themes().len(), 5);
        assert_eq!(matrix.dataset_count(), 28);

        let heritage = matrix.datasets_for(&Theme::Heritage).unwrap();
        let achris = heritage.iter().find(|d| d.name == "achris_sites").unwrap();
        assert!(achris.extra_columns().contains(&("COMPONENT_NO", "ACHRIS_ID")));
    }

    #[test]
    fn test_builtin_mode_policy() {
        let matrix = DatasetMatrix::builtin().unwrap();
        assert!(matrix.skips_theme(Mode::Lrli, &Theme::Heritage));
        assert!(!matrix.skips_theme(Mode::Lrli, &Theme::Forests));
        assert!(!matrix.skips_theme(Mode::Dap, &Theme::Heritage));
    }

    #[test]
    fn test_builtin_mode_keyed_buffers() {
        let matrix = DatasetMatrix::builtin().unwrap();
        let forests = matrix.datasets_for(&Theme::Forests).unwrap();
        let fmz = forests.iter().find(|d| d.name == "fmz").unwrap();
        match &fmz.buffer {
            BufferSelection::PerMode(map) => assert_eq!(map[&Mode::Jfmp], "50m"),
            other => panic!("unexpected {:?}", other),
        }

        let bio = matrix.datasets_for(&Theme::Biodiversity).unwrap();
        let owls = bio.iter().find(|d| d.name == "vba_fauna_restricted").unwrap();
        match &owls.buffer {
            BufferSelection::PerModeMulti(map) => assert_eq!(map[&Mode::Jfmp].len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_entries_are_rejected_not_fatal() {
        let matrix = DatasetMatrix::from_toml_str(
            r#"
[[buffers]]
name = "1m"
distance = "1 meter"

[[themes]]
name = "water"

[[themes.datasets]]
name = "ok"
path = "{csdl}/A"
fields = ["NAME"]
value_type = "A"
value_field = "NAME"

[[themes.datasets]]
name = "no_fields"
path = "{csdl}/B"
value_type = "B"

[[themes.datasets]]
name = "bad_buffer"
path = "{csdl}/C"
fields = ["NAME"]
value_type = "C"
buffer = "75m"

[[themes.datasets]]
name = "ok"
path = "{csdl}/D"
fields = ["NAME"]
value_type = "D"
"#,
        )
        .unwrap();

        let water = matrix.datasets_for(&Theme::Water).unwrap();
        assert_eq!(water.len(), 1);
        let rejected: Vec<&str> = matrix.rejected().iter().map(|r| r.dataset.as_str()).collect();
        assert_eq!(rejected, vec!["no_fields", "bad_buffer", "ok"]);
    }

    #[test]
    fn test_catalogue_errors_are_fatal() {
        let result = DatasetMatrix::from_toml_str(
            r#"
[[buffers]]
name = "ring"
source = "missing"
distance = "10 meters"
"#,
        );
        assert!(result.unwrap_err().is_fatal());
    }
}
