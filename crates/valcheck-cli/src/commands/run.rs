//! Run command implementation

use super::mode_arg;
use crate::cli::RunArgs;
use crate::config_loader::{load_config_with_overrides, load_matrix, load_rules};
use crate::dry_run::{display_planned_actions, plan_job};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::{PassRow, RunOutput, ThemeRow};
use anyhow::Result;
use std::path::Path;
use valcheck_core::config::CliConfigOverrides;
use valcheck_core::models::Theme;
use valcheck_engine::{JobSettings, PassStatus, ValuesChecker};
use valcheck_store::MemoryEngine;

pub fn execute(
    args: RunArgs,
    config_file: Option<&Path>,
    output: &OutputWriter,
    dry_run: bool,
) -> Result<()> {
    let themes = if args.themes.is_empty() {
        None
    } else {
        Some(args.themes.iter().map(|t| Theme::from(t.as_str())).collect())
    };
    let overrides = CliConfigOverrides {
        mode: mode_arg(args.mode.as_deref())?,
        themes,
        works: args.works,
        output_dir: args.output_dir,
        matrix: args.matrix,
        district: args.district,
    };
    let config = load_config_with_overrides(config_file, overrides)?;
    if config.works.value.is_none() {
        return Err(errors::works_not_set().into());
    }

    let matrix = load_matrix(&config)?;
    let rules = load_rules(&config)?;
    let settings = JobSettings::from_config(&config)?;

    for rejected in matrix.rejected() {
        output.warning(format!(
            "Dataset {}/{} will be skipped: {}",
            rejected.theme, rejected.dataset, rejected.reason
        ));
    }

    if dry_run {
        output.section("Configuration");
        let mut entries: Vec<_> = config.to_inspection_map().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, (value, source)) in entries {
            output.kv(key, format!("{} ({:?})", value, source));
        }
        let actions = plan_job(&settings, &matrix);
        return display_planned_actions(output, &actions);
    }

    let checker = ValuesChecker::new(MemoryEngine::new(), matrix, rules, settings);
    let outcome = checker.process();
    let summary = RunOutput::from(&outcome);

    if !outcome.is_success() {
        output.result("error", &summary)?;
        return Err(errors::job_failed(&outcome.message).into());
    }

    output.section(format!("Values Check ({} mode)", outcome.mode));
    output.kv("Run ID", &outcome.run_id);
    output.kv("Works", outcome.works);
    output.kv("Results", outcome.total_results());
    output.table(ThemeRow::summarise(&outcome));

    let unfinished: Vec<PassRow> = outcome
        .passes
        .iter()
        .filter(|p| !matches!(p.status, PassStatus::Completed { .. }))
        .map(PassRow::from)
        .collect();
    if !unfinished.is_empty() {
        output.section("Skipped and Failed Passes");
        output.table(unfinished);
    }

    output.section("Reports");
    for path in &outcome.outputs {
        output.info(path.display());
    }
    output.success(&outcome.message);

    output.result("success", &summary)
}
