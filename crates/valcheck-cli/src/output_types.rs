use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;
use valcheck_core::matrix::RejectedDataset;
use valcheck_core::models::BufferSpec;
use valcheck_engine::{JobOutcome, PassRecord, PassStatus};

/// Output for run command
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub status: String,
    pub message: String,
    pub mode: String,
    pub works: usize,
    pub total_results: usize,
    pub result_counts: BTreeMap<String, usize>,
    pub outputs: Vec<String>,
    pub passes: Vec<PassRow>,
}

impl From<&JobOutcome> for RunOutput {
    fn from(outcome: &JobOutcome) -> Self {
        Self {
            run_id: outcome.run_id.clone(),
            status: if outcome.is_success() { "success" } else { "failed" }.to_string(),
            message: outcome.message.clone(),
            mode: outcome.mode.to_string(),
            works: outcome.works,
            total_results: outcome.total_results(),
            result_counts: outcome
                .result_counts()
                .into_iter()
                .map(|(theme, count)| (theme.to_string(), count))
                .collect(),
            outputs: outcome.outputs.iter().map(|p| p.display().to_string()).collect(),
            passes: outcome.passes.iter().map(PassRow::from).collect(),
        }
    }
}

/// Per-theme summary row
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ThemeRow {
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[tabled(rename = "Passes")]
    pub passes: usize,
    #[tabled(rename = "Skipped")]
    pub skipped: usize,
    #[tabled(rename = "Failed")]
    pub failed: usize,
    #[tabled(rename = "Results")]
    pub results: usize,
}

impl ThemeRow {
    pub fn summarise(outcome: &JobOutcome) -> Vec<Self> {
        outcome
            .results
            .iter()
            .map(|(theme, rows)| {
                let passes: Vec<&PassRecord> =
                    outcome.passes.iter().filter(|p| &p.theme == theme).collect();
                let count = |f: fn(&PassStatus) -> bool| passes.iter().filter(|p| f(&p.status)).count();
                Self {
                    theme: theme.to_string(),
                    passes: passes.len(),
                    skipped: count(|s| matches!(s, PassStatus::Skipped { .. })),
                    failed: count(|s| matches!(s, PassStatus::Failed { .. })),
                    results: rows.len(),
                }
            })
            .collect()
    }
}

/// One overlay pass
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PassRow {
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[tabled(rename = "Dataset")]
    pub dataset: String,
    #[tabled(rename = "Buffer")]
    pub buffer: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl From<&PassRecord> for PassRow {
    fn from(record: &PassRecord) -> Self {
        let (status, detail) = match &record.status {
            PassStatus::Completed { results } => ("completed", format!("{} results", results)),
            PassStatus::Skipped { reason } => ("skipped", reason.clone()),
            PassStatus::Failed { reason } => ("failed", reason.clone()),
        };
        Self {
            theme: record.theme.to_string(),
            dataset: record.dataset.clone(),
            buffer: record.buffer.clone().unwrap_or_else(|| "-".to_string()),
            status: status.to_string(),
            detail,
        }
    }
}

/// Output for validate command
#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub matrix: String,
    pub themes: usize,
    pub datasets: usize,
    pub buffers: Vec<BufferRow>,
    pub rejected: Vec<IssueRow>,
    pub path_issues: Vec<IssueRow>,
    pub forest_rules: usize,
    pub heritage_rules: usize,
}

impl ValidateOutput {
    pub fn is_valid(&self) -> bool {
        self.rejected.is_empty() && self.path_issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct BufferRow {
    #[tabled(rename = "Class")]
    pub name: String,
    #[tabled(rename = "Distance")]
    pub distance: String,
    #[tabled(rename = "Style")]
    pub style: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl From<&BufferSpec> for BufferRow {
    fn from(spec: &BufferSpec) -> Self {
        Self {
            name: spec.name.clone(),
            distance: spec.distance.to_string(),
            style: spec.style.to_string(),
            source: spec.source.to_string(),
        }
    }
}

/// A dataset that cannot be evaluated as configured
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct IssueRow {
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[tabled(rename = "Dataset")]
    pub dataset: String,
    #[tabled(rename = "Problem")]
    pub reason: String,
}

impl From<&RejectedDataset> for IssueRow {
    fn from(rejected: &RejectedDataset) -> Self {
        Self {
            theme: rejected.theme.to_string(),
            dataset: rejected.dataset.clone(),
            reason: rejected.reason.clone(),
        }
    }
}

/// Output for matrix command
#[derive(Debug, Serialize)]
pub struct MatrixOutput {
    pub mode: String,
    pub skipped_themes: Vec<String>,
    pub datasets: Vec<DatasetRow>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct DatasetRow {
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[tabled(rename = "Dataset")]
    pub dataset: String,
    #[tabled(rename = "Value Type")]
    pub value_type: String,
    #[tabled(rename = "Buffers")]
    pub buffers: String,
    #[tabled(rename = "Enabled")]
    pub enabled: bool,
    #[tabled(rename = "High Risk Only")]
    pub high_risk_only: bool,
}
