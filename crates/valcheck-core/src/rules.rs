//! Mitigation advice tables and identifier recipes.
//!
//! These are lookup data only; which table applies to a result is decided by
//! the engine.

use crate::error::{Result, ValcheckError};
use crate::models::{Mode, Theme};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const BUILTIN_RULES: &str = include_str!("../data/rules.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralAdvice {
    pub default: String,
    pub forests_default: String,
    pub heritage_default: String,
    pub biodiversity: String,
    pub water: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeritageRule {
    pub risk_level: String,
    pub sites: String,
    pub sensitivity: String,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTitleAdvice {
    /// Result column holding the native title status
    pub status_field: String,
    pub extinguished: String,
    pub low_impact: String,
    pub consult: String,
    pub glawac_future_act: String,
    pub other_future_act: String,
}

#[derive(Debug, Deserialize)]
struct RawIdentifiers {
    #[serde(default)]
    primary: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    fallback: Vec<String>,
    alternate: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRules {
    advice: GeneralAdvice,
    #[serde(default)]
    forests: BTreeMap<String, String>,
    #[serde(default)]
    heritage: Vec<HeritageRule>,
    native_title: NativeTitleAdvice,
    identifiers: RawIdentifiers,
}

/// Field lists concatenated into result identifiers
#[derive(Debug, Clone, Serialize)]
pub struct IdentifierRecipes {
    pub primary: BTreeMap<Mode, BTreeMap<Theme, Vec<String>>>,
    pub fallback: Vec<String>,
    pub alternate: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleTables {
    pub advice: GeneralAdvice,
    pub forests: BTreeMap<String, String>,
    heritage: HashMap<(String, String, String), String>,
    pub native_title: NativeTitleAdvice,
    pub identifiers: IdentifierRecipes,
}

impl RuleTables {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ValcheckError::ConfigInvalid {
            key: "rules".to_string(),
            reason: format!("Failed to read rules file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawRules = toml::from_str(content).map_err(|e| ValcheckError::ConfigInvalid {
            key: "rules".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })?;

        let mut heritage = HashMap::with_capacity(raw.heritage.len());
        for rule in raw.heritage {
            let key = (rule.risk_level, rule.sites, rule.sensitivity);
            if heritage.contains_key(&key) {
                return Err(ValcheckError::ConfigInvalid {
                    key: "rules.heritage".to_string(),
                    reason: format!("duplicate heritage rule for {:?}", key),
                });
            }
            heritage.insert(key, rule.advice);
        }

        if raw.identifiers.fallback.is_empty() || raw.identifiers.alternate.is_empty() {
            return Err(ValcheckError::ConfigInvalid {
                key: "rules.identifiers".to_string(),
                reason: "fallback and alternate field lists must not be empty".to_string(),
            });
        }

        let mut primary = BTreeMap::new();
        for (mode, themes) in raw.identifiers.primary {
            let mode: Mode = mode.parse()?;
            let themes = themes.into_iter().map(|(theme, fields)| (Theme::from(theme), fields));
            primary.insert(mode, themes.collect());
        }

        Ok(Self {
            advice: raw.advice,
            forests: raw.forests,
            heritage,
            native_title: raw.native_title,
            identifiers: IdentifierRecipes {
                primary,
                fallback: raw.identifiers.fallback,
                alternate: raw.identifiers.alternate,
            },
        })
    }

    /// Forest advice for a value type, or the forest default
    pub fn forest_advice(&self, value_type: &str) -> &str {
        self.forests.get(value_type).unwrap_or(&self.advice.forests_default)
    }

    /// Heritage advice for a composite key, or the heritage default
    pub fn heritage_advice(&self, risk_level: &str, sites: &str, sensitivity: &str) -> &str {
        let key = (risk_level.to_string(), sites.to_string(), sensitivity.to_string());
        self.heritage.get(&key).unwrap_or(&self.advice.heritage_default)
    }

    pub fn heritage_rule_count(&self) -> usize {
        self.heritage.len()
    }

    /// Primary identifier field list for a mode and theme
    pub fn identifier_fields(&self, mode: Mode, theme: &Theme) -> Option<&[String]> {
        self.identifiers.primary.get(&mode)?.get(theme).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables() {
        let rules = RuleTables::builtin().unwrap();
        assert_eq!(rules.forests.len(), 17);
        assert_eq!(rules.heritage_rule_count(), 6);
        assert_eq!(rules.identifiers.alternate.len(), 6);
    }

    #[test]
    fn test_forest_lookup_with_default() {
        let rules = RuleTables::builtin().unwrap();
        assert!(rules.forest_advice("FMZ").starts_with("Refer to Action Statement"));
        assert_eq!(rules.forest_advice("Unknown Thing"), "Standard work practices apply");
    }

    #[test]
    fn test_heritage_lookup() {
        let rules = RuleTables::builtin().unwrap();
        assert_eq!(
            rules.heritage_advice("DAP", "Yes", "Yes"),
            "Sites and sensitivity detected. Heritage specialist assessment required. Permit if harm unavoidable"
        );
        assert_eq!(rules.heritage_advice("LRLI", "Yes", "No"), "Heritage assessment required");
    }

    #[test]
    fn test_identifier_matrix_has_no_lrli_recipes() {
        let rules = RuleTables::builtin().unwrap();
        assert!(rules.identifier_fields(Mode::Lrli, &Theme::Forests).is_none());
        let nbft_bio = rules.identifier_fields(Mode::Nbft, &Theme::Biodiversity).unwrap();
        assert_eq!(nbft_bio[1], "RECORD_ID");
    }

    #[test]
    fn test_duplicate_heritage_rule_rejected() {
        let content = BUILTIN_RULES.replace(
            "risk_level = \"LRLI\"\nsites = \"No\"\nsensitivity = \"Yes\"",
            "risk_level = \"LRLI\"\nsites = \"No\"\nsensitivity = \"No\"",
        );
        assert!(RuleTables::from_toml_str(&content).is_err());
    }
}
