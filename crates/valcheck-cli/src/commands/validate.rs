//! Validate command implementation

use crate::cli::ValidateArgs;
use crate::config_loader::{load_config_with_overrides, load_matrix, load_rules};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::{BufferRow, IssueRow, ValidateOutput};
use anyhow::Result;
use std::path::Path;
use valcheck_core::config::CliConfigOverrides;

pub fn execute(args: ValidateArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let overrides = CliConfigOverrides { matrix: args.matrix, ..Default::default() };
    let config = load_config_with_overrides(config_file, overrides)?;

    // Catalogue errors are fatal and surface here
    let matrix = load_matrix(&config)?;
    let rules = load_rules(&config)?;

    let mut path_issues = Vec::new();
    for theme in matrix.themes() {
        for spec in &theme.datasets {
            if let Err(e) = spec.resolve_path(&config.path_aliases.value) {
                path_issues.push(IssueRow {
                    theme: theme.theme.to_string(),
                    dataset: spec.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let report = ValidateOutput {
        matrix: config
            .matrix
            .value
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string()),
        themes: matrix.themes().len(),
        datasets: matrix.dataset_count(),
        buffers: matrix.catalogue().specs().iter().map(BufferRow::from).collect(),
        rejected: matrix.rejected().iter().map(IssueRow::from).collect(),
        path_issues,
        forest_rules: rules.forests.len(),
        heritage_rules: rules.heritage_rule_count(),
    };

    output.section("Dataset Matrix");
    output.kv("Source", &report.matrix);
    output.kv("Themes", report.themes);
    output.kv("Datasets", report.datasets);
    output.kv("Forest advice entries", report.forest_rules);
    output.kv("Heritage advice entries", report.heritage_rules);

    output.section("Buffer Catalogue");
    output.table(report.buffers.clone());

    if !report.rejected.is_empty() {
        output.section("Rejected Datasets");
        output.table(report.rejected.clone());
    }
    if !report.path_issues.is_empty() {
        output.section("Unresolved Paths");
        output.table(report.path_issues.clone());
    }

    if report.is_valid() {
        output.success("Matrix and rule tables are valid");
        output.result("success", &report)
    } else {
        let count = report.rejected.len() + report.path_issues.len();
        output.result("error", &report)?;
        Err(errors::matrix_invalid(count).into())
    }
}
