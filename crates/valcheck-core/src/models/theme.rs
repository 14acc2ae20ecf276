use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level grouping of value datasets.
///
/// The five known themes carry their own mitigation dispatch; any other name
/// is accepted and receives the generic advice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    Forests,
    Biodiversity,
    Heritage,
    Summary,
    Water,
    Other(String),
}

impl Theme {
    pub const KNOWN: [Theme; 5] =
        [Theme::Forests, Theme::Biodiversity, Theme::Heritage, Theme::Summary, Theme::Water];

    pub fn as_str(&self) -> &str {
        match self {
            Theme::Forests => "forests",
            Theme::Biodiversity => "biodiversity",
            Theme::Heritage => "heritage",
            Theme::Summary => "summary",
            Theme::Water => "water",
            Theme::Other(name) => name,
        }
    }
}

impl From<String> for Theme {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "forests" => Theme::Forests,
            "biodiversity" => Theme::Biodiversity,
            "heritage" => Theme::Heritage,
            "summary" => Theme::Summary,
            "water" => Theme::Water,
            _ => Theme::Other(s.trim().to_string()),
        }
    }
}

impl From<&str> for Theme {
    fn from(s: &str) -> Self {
        Theme::from(s.to_string())
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

impl FromStr for Theme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Theme::from(s))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_other() {
        assert_eq!(Theme::from("Heritage"), Theme::Heritage);
        assert_eq!(Theme::from("roads"), Theme::Other("roads".to_string()));
        assert_eq!(Theme::Other("roads".to_string()).to_string(), "roads");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Theme::Water).unwrap();
        assert_eq!(json, "\"water\"");
        let back: Theme = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Theme::Water);
    }
}
