//! Matrix command implementation

use super::mode_arg;
use crate::cli::MatrixArgs;
use crate::config_loader::{load_config_with_overrides, load_matrix};
use crate::output::OutputWriter;
use crate::output_types::{DatasetRow, MatrixOutput};
use anyhow::Result;
use std::path::Path;
use valcheck_core::config::CliConfigOverrides;
use valcheck_core::models::Theme;
use valcheck_engine::applicability::{is_enabled, resolve_buffer_classes};

pub fn execute(args: MatrixArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let overrides = CliConfigOverrides {
        mode: mode_arg(args.mode.as_deref())?,
        matrix: args.matrix,
        ..Default::default()
    };
    let config = load_config_with_overrides(config_file, overrides)?;
    let mode = config.mode.value;
    let matrix = load_matrix(&config)?;
    let only = args.theme.as_deref().map(Theme::from);

    let mut datasets = Vec::new();
    let mut skipped_themes = Vec::new();
    for theme in matrix.themes() {
        if only.as_ref().is_some_and(|t| t != &theme.theme) {
            continue;
        }
        let skipped = matrix.skips_theme(mode, &theme.theme);
        if skipped {
            skipped_themes.push(theme.theme.to_string());
        }

        for spec in &theme.datasets {
            let buffers = match resolve_buffer_classes(spec, mode) {
                Ok(classes) => classes.join(", "),
                Err(_) => format!("(none for {})", mode),
            };
            datasets.push(DatasetRow {
                theme: theme.theme.to_string(),
                dataset: spec.name.clone(),
                value_type: spec.value_type.clone(),
                buffers,
                enabled: !skipped && is_enabled(spec, mode),
                high_risk_only: spec.high_risk_only,
            });
        }
    }

    let report = MatrixOutput { mode: mode.to_string(), skipped_themes, datasets };

    output.section(format!("Datasets for {} mode", report.mode));
    if !report.skipped_themes.is_empty() {
        output.info(format!("Themes not evaluated: {}", report.skipped_themes.join(", ")));
    }
    output.table(report.datasets.clone());

    output.result("success", &report)
}
