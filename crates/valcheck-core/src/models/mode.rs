use crate::error::{Result, ValcheckError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating context of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Development activity plan
    Dap,
    /// Joint fuel management plan (planned burns)
    Jfmp,
    /// Non-burn fuel treatment
    Nbft,
    /// Low risk, low impact works
    Lrli,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Dap, Mode::Jfmp, Mode::Nbft, Mode::Lrli];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Dap => "DAP",
            Mode::Jfmp => "JFMP",
            Mode::Nbft => "NBFT",
            Mode::Lrli => "LRLI",
        }
    }
}

impl FromStr for Mode {
    type Err = ValcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAP" => Ok(Mode::Dap),
            "JFMP" => Ok(Mode::Jfmp),
            "NBFT" => Ok(Mode::Nbft),
            "LRLI" => Ok(Mode::Lrli),
            _ => Err(ValcheckError::ConfigInvalid {
                key: "mode".to_string(),
                reason: format!("Invalid mode: {}. Use DAP, JFMP, NBFT, or LRLI", s),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("jfmp".parse::<Mode>().unwrap(), Mode::Jfmp);
        assert_eq!(" LRLI ".parse::<Mode>().unwrap(), Mode::Lrli);
        assert!("burn".parse::<Mode>().is_err());
    }

    #[test]
    fn test_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Mode::Nbft).unwrap(), "\"NBFT\"");
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
