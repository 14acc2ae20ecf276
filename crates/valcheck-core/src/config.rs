use crate::error::{Result, ValcheckError};
use crate::models::{Mode, PathAliases, Theme, WorkFields};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered job configuration for valcheck
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub mode: ConfigValue<Mode>,
    pub themes: ConfigValue<Vec<Theme>>,
    pub works: ConfigValue<Option<PathBuf>>,
    pub output_dir: ConfigValue<PathBuf>,
    pub matrix: ConfigValue<Option<PathBuf>>,
    pub rules: ConfigValue<Option<PathBuf>>,
    pub district: ConfigValue<Option<String>>,
    pub path_aliases: ConfigValue<PathAliases>,
    pub work_fields: ConfigValue<WorkFields>,
    pub lowest_risk: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            mode: ConfigValue::new(Mode::Dap, ConfigSource::Default),
            themes: ConfigValue::new(
                vec![Theme::Forests, Theme::Biodiversity],
                ConfigSource::Default,
            ),
            works: ConfigValue::new(None, ConfigSource::Default),
            output_dir: ConfigValue::new(PathBuf::from("valcheck-output"), ConfigSource::Default),
            matrix: ConfigValue::new(None, ConfigSource::Default),
            rules: ConfigValue::new(None, ConfigSource::Default),
            district: ConfigValue::new(None, ConfigSource::Default),
            path_aliases: ConfigValue::new(default_path_aliases(), ConfigSource::Default),
            work_fields: ConfigValue::new(WorkFields::default(), ConfigSource::Default),
            lowest_risk: ConfigValue::new("LRLI".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ValcheckError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| ValcheckError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let anchor = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        if let Some(mode) = file_config.mode {
            self.mode.update(parse_mode(&mode)?, ConfigSource::File);
        }

        if let Some(themes) = file_config.themes {
            self.themes.update(themes.into_iter().map(Theme::from).collect(), ConfigSource::File);
        }

        if let Some(works) = file_config.works {
            self.works.update(Some(anchor(works)), ConfigSource::File);
        }

        if let Some(output_dir) = file_config.output_dir {
            self.output_dir.update(anchor(output_dir), ConfigSource::File);
        }

        if let Some(matrix) = file_config.matrix {
            self.matrix.update(Some(anchor(matrix)), ConfigSource::File);
        }

        if let Some(rules) = file_config.rules {
            self.rules.update(Some(anchor(rules)), ConfigSource::File);
        }

        if let Some(district) = file_config.district {
            self.district.update(Some(district), ConfigSource::File);
        }

        if let Some(aliases) = file_config.path_aliases {
            let mut merged = self.path_aliases.value.clone();
            merged.extend(aliases);
            self.path_aliases.update(merged, ConfigSource::File);
        }

        if let Some(work_fields) = file_config.work_fields {
            self.work_fields.update(work_fields, ConfigSource::File);
        }

        if let Some(lowest_risk) = file_config.lowest_risk {
            self.lowest_risk.update(lowest_risk, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // VALCHECK_MODE
        if let Ok(mode_str) = env::var("VALCHECK_MODE") {
            match parse_mode(&mode_str) {
                Ok(mode) => self.mode.update(mode, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid VALCHECK_MODE value '{}': expected DAP, JFMP, NBFT, or LRLI",
                    mode_str
                ),
            }
        }

        // VALCHECK_THEMES
        if let Ok(themes_str) = env::var("VALCHECK_THEMES") {
            match parse_themes(&themes_str) {
                Ok(themes) => self.themes.update(themes, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid VALCHECK_THEMES value '{}': expected a comma separated theme list",
                    themes_str
                ),
            }
        }

        // VALCHECK_WORKS
        if let Ok(works) = env::var("VALCHECK_WORKS") {
            if !works.trim().is_empty() {
                self.works.update(Some(PathBuf::from(works)), ConfigSource::Environment);
            }
        }

        // VALCHECK_OUTPUT_DIR
        if let Ok(output_dir) = env::var("VALCHECK_OUTPUT_DIR") {
            if !output_dir.trim().is_empty() {
                self.output_dir.update(PathBuf::from(output_dir), ConfigSource::Environment);
            }
        }

        // VALCHECK_DISTRICT
        if let Ok(district) = env::var("VALCHECK_DISTRICT") {
            if !district.trim().is_empty() {
                self.district.update(Some(district), ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(mode) = overrides.mode {
            self.mode.update(mode, ConfigSource::Cli);
        }

        if let Some(themes) = overrides.themes {
            self.themes.update(themes, ConfigSource::Cli);
        }

        if let Some(works) = overrides.works {
            self.works.update(Some(works), ConfigSource::Cli);
        }

        if let Some(output_dir) = overrides.output_dir {
            self.output_dir.update(output_dir, ConfigSource::Cli);
        }

        if let Some(matrix) = overrides.matrix {
            self.matrix.update(Some(matrix), ConfigSource::Cli);
        }

        if let Some(district) = overrides.district {
            self.district.update(Some(district), ConfigSource::Cli);
        }
    }

    /// Works layer path, which has no default
    pub fn require_works(&self) -> Result<&Path> {
        self.works
            .value
            .as_deref()
            .ok_or_else(|| ValcheckError::ConfigMissing { key: "works".to_string() })
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();
        let optional_path = |p: &Option<PathBuf>, unset: &str| {
            p.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| unset.to_string())
        };

        map.insert("mode".to_string(), (self.mode.value.to_string(), self.mode.source));

        map.insert(
            "themes".to_string(),
            (
                self.themes.value.iter().map(Theme::to_string).collect::<Vec<_>>().join(", "),
                self.themes.source,
            ),
        );

        map.insert(
            "works".to_string(),
            (optional_path(&self.works.value, "(not set)"), self.works.source),
        );

        map.insert(
            "output_dir".to_string(),
            (self.output_dir.value.display().to_string(), self.output_dir.source),
        );

        map.insert(
            "matrix".to_string(),
            (optional_path(&self.matrix.value, "(built-in)"), self.matrix.source),
        );

        map.insert(
            "rules".to_string(),
            (optional_path(&self.rules.value, "(built-in)"), self.rules.source),
        );

        map.insert(
            "district".to_string(),
            (
                self.district.value.clone().unwrap_or_else(|| "(all)".to_string()),
                self.district.source,
            ),
        );

        map.insert(
            "path_aliases".to_string(),
            (
                self.path_aliases
                    .value
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", "),
                self.path_aliases.source,
            ),
        );

        map.insert(
            "work_fields".to_string(),
            (self.work_fields.value.carried().join(", "), self.work_fields.source),
        );

        map.insert(
            "lowest_risk".to_string(),
            (self.lowest_risk.value.clone(), self.lowest_risk.source),
        );

        map
    }
}

fn default_path_aliases() -> PathAliases {
    ["csdl", "csdl_restricted", "csdl_culture", "regional"]
        .into_iter()
        .map(|alias| (alias.to_string(), format!("data/{}", alias)))
        .collect()
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    mode: Option<String>,
    themes: Option<Vec<String>>,
    works: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    matrix: Option<PathBuf>,
    rules: Option<PathBuf>,
    district: Option<String>,
    path_aliases: Option<PathAliases>,
    work_fields: Option<WorkFields>,
    lowest_risk: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub mode: Option<Mode>,
    pub themes: Option<Vec<Theme>>,
    pub works: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub matrix: Option<PathBuf>,
    pub district: Option<String>,
}

/// Parse mode from string
pub fn parse_mode(s: &str) -> Result<Mode> {
    s.parse()
}

/// Parse a comma separated theme list
pub fn parse_themes(s: &str) -> Result<Vec<Theme>> {
    let themes: Vec<Theme> = s
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Theme::from)
        .collect();

    if themes.is_empty() {
        return Err(ValcheckError::ConfigInvalid {
            key: "themes".to_string(),
            reason: "at least one theme is required".to_string(),
        });
    }

    Ok(themes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.mode.value, Mode::Dap);
        assert_eq!(config.mode.source, ConfigSource::Default);
        assert_eq!(config.themes.value, vec![Theme::Forests, Theme::Biodiversity]);
        assert_eq!(config.lowest_risk.value, "LRLI");
        assert!(config.path_aliases.value.contains_key("csdl_culture"));
        assert!(config.require_works().is_err());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400); // Still CLI value
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mode = "jfmp"
themes = ["forests", "summary"]
works = "/data/works/Tambo_2324_DAP.geojson"
district = "Tambo"

[path_aliases]
csdl = "/srv/csdl"

[work_fields]
id = "WORK_ID"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.mode.value, Mode::Jfmp);
        assert_eq!(config.mode.source, ConfigSource::File);
        assert_eq!(config.themes.value, vec![Theme::Forests, Theme::Summary]);
        assert_eq!(config.district.value.as_deref(), Some("Tambo"));
        assert_eq!(config.path_aliases.value["csdl"], "/srv/csdl");
        // Unlisted aliases keep their defaults
        assert!(config.path_aliases.value.contains_key("regional"));
        assert_eq!(config.work_fields.value.id, "WORK_ID");
        assert_eq!(config.work_fields.value.name, "DAP_NAME");
        assert_eq!(config.output_dir.source, ConfigSource::Default);
    }

    #[test]
    fn test_bad_mode_in_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"burn\"").unwrap();
        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("VALCHECK_MODE", "NBFT");
        env::set_var("VALCHECK_THEMES", "water, heritage");
        env::set_var("VALCHECK_DISTRICT", "Snowy");

        let config = LayeredConfig::with_defaults().load_from_env();

        env::remove_var("VALCHECK_MODE");
        env::remove_var("VALCHECK_THEMES");
        env::remove_var("VALCHECK_DISTRICT");

        assert_eq!(config.mode.value, Mode::Nbft);
        assert_eq!(config.mode.source, ConfigSource::Environment);
        assert_eq!(config.themes.value, vec![Theme::Water, Theme::Heritage]);
        assert_eq!(config.district.value.as_deref(), Some("Snowy"));
    }

    #[test]
    #[serial]
    fn test_invalid_env_ignored() {
        env::set_var("VALCHECK_MODE", "burn");
        let config = LayeredConfig::with_defaults().load_from_env();
        env::remove_var("VALCHECK_MODE");

        assert_eq!(config.mode.value, Mode::Dap);
        assert_eq!(config.mode.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            mode: Some(Mode::Lrli),
            works: Some(PathBuf::from("works.geojson")),
            ..Default::default()
        };

        config.update_from_cli(overrides);

        assert_eq!(config.mode.value, Mode::Lrli);
        assert_eq!(config.mode.source, ConfigSource::Cli);
        assert_eq!(config.require_works().unwrap(), Path::new("works.geojson"));
        // These should still be defaults
        assert_eq!(config.themes.source, ConfigSource::Default);
        assert_eq!(config.district.source, ConfigSource::Default);
    }

    #[test]
    fn test_parse_themes() {
        assert_eq!(parse_themes("forests,water").unwrap(), vec![Theme::Forests, Theme::Water]);
        assert!(parse_themes(" , ").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("mode"));
        assert!(map.contains_key("path_aliases"));
        assert!(map.contains_key("work_fields"));

        let (matrix_value, matrix_source) = &map["matrix"];
        assert_eq!(matrix_value, "(built-in)");
        assert_eq!(*matrix_source, ConfigSource::Default);
    }
}
