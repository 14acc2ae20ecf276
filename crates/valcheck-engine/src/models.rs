use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use valcheck_core::config::LayeredConfig;
use valcheck_core::error::Result;
use valcheck_core::models::{Mode, PathAliases, Theme, ValueResult, WorkFields};

/// Parameters fixed for the whole of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    pub mode: Mode,
    pub themes: Vec<Theme>,
    /// Location of the works layer
    pub works: PathBuf,
    pub output_dir: PathBuf,
    /// Only evaluate works in this district
    pub district: Option<String>,
    pub path_aliases: PathAliases,
    pub work_fields: WorkFields,
    /// Risk category treated as lowest risk / low impact
    pub lowest_risk: String,
    /// Date stamped on every result and used as the report prefix
    pub date_checked: NaiveDate,
}

impl JobSettings {
    /// Settings from resolved configuration, dated today
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Ok(Self {
            mode: config.mode.value,
            themes: config.themes.value.clone(),
            works: config.require_works()?.to_path_buf(),
            output_dir: config.output_dir.value.clone(),
            district: config.district.value.clone(),
            path_aliases: config.path_aliases.value.clone(),
            work_fields: config.work_fields.value.clone(),
            lowest_risk: config.lowest_risk.value.clone(),
            date_checked: Local::now().date_naive(),
        })
    }
}

/// How one (dataset, buffer class) overlay pass ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PassStatus {
    /// Results were produced (possibly zero rows after dropping blank ids)
    Completed { results: usize },
    /// Expected, non-error skip such as an empty selection
    Skipped { reason: String },
    /// Recoverable failure confined to this pass
    Failed { reason: String },
}

/// Record of one overlay pass, or of a dataset that never reached one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    pub theme: Theme,
    pub dataset: String,
    /// Buffer class used, absent when the dataset failed before overlay
    pub buffer: Option<String>,
    #[serde(flatten)]
    pub status: PassStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
}

/// Final result of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub run_id: String,
    pub status: JobStatus,
    pub message: String,
    pub mode: Mode,
    /// Files written to the output directory
    pub outputs: Vec<PathBuf>,
    /// Number of prepared works evaluated
    pub works: usize,
    pub passes: Vec<PassRecord>,
    pub results: BTreeMap<Theme, Vec<ValueResult>>,
}

impl JobOutcome {
    pub fn failed(run_id: impl Into<String>, mode: Mode, message: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: JobStatus::Failed,
            message: message.into(),
            mode,
            outputs: Vec::new(),
            works: 0,
            passes: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Result count per theme, including themes without results
    pub fn result_counts(&self) -> BTreeMap<&Theme, usize> {
        self.results.iter().map(|(theme, rows)| (theme, rows.len())).collect()
    }

    pub fn total_results(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}
