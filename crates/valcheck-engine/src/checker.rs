use crate::applicability::{is_enabled, resolve_buffer_classes};
use crate::buffers::{resolve_buffers, BufferSet};
use crate::identifier::apply_identifiers;
use crate::mitigation::apply_mitigation;
use crate::models::{JobOutcome, JobSettings, JobStatus, PassRecord, PassStatus};
use crate::overlay::{evaluate_dataset, quote_literal, OverlayContext};
use crate::report::{prepare_workspace, report_prefix, write_reports, ReportSet};
use crate::scope::TempDatasets;
use std::collections::BTreeMap;
use uuid::Uuid;
use valcheck_core::error::{Result, ValcheckError};
use valcheck_core::models::{Theme, ValueResult, WorkFeature};
use valcheck_core::{DatasetMatrix, GeometryEngine, LayerHandle, RuleTables};

/// Runs one values-checking job: one mode, one works layer, a set of themes
pub struct ValuesChecker<E: GeometryEngine> {
    engine: E,
    matrix: DatasetMatrix,
    rules: RuleTables,
    settings: JobSettings,
}

/// Works layer after filtering and geometry fields
struct PreparedWorks {
    layer: LayerHandle,
    features: Vec<WorkFeature>,
}

impl<E: GeometryEngine> ValuesChecker<E> {
    pub fn new(engine: E, matrix: DatasetMatrix, rules: RuleTables, settings: JobSettings) -> Self {
        Self { engine, matrix, rules, settings }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Run the job.
    ///
    /// Per-dataset problems are recorded in the outcome's passes; only
    /// workspace and works-layer failures (and catalogue ordering bugs) fail
    /// the job. Intermediate layers are deleted on every path.
    pub fn process(&self) -> JobOutcome {
        let run_id = Uuid::new_v4().to_string();
        let mode = self.settings.mode;
        let span = tracing::info_span!("job", run_id = %run_id, mode = %mode);
        let _guard = span.enter();

        tracing::info!(
            "Starting values check of {} for themes {:?}",
            self.settings.works.display(),
            self.settings.themes.iter().map(Theme::as_str).collect::<Vec<_>>()
        );

        let mut scope = TempDatasets::new(&self.engine);
        let outcome = match self.run(&run_id, &mut scope) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Job failed: {}", e);
                JobOutcome::failed(run_id, mode, e.to_string())
            }
        };
        drop(scope);

        tracing::info!("Job finished: {}", outcome.message);
        outcome
    }

    fn run(&self, run_id: &str, scope: &mut TempDatasets<'_, E>) -> Result<JobOutcome> {
        let settings = &self.settings;

        // Phase 1: Output workspace
        prepare_workspace(&settings.output_dir)?;

        // Phase 2: Works layer
        let works = self.prepare_works(scope)?;
        tracing::info!("Prepared {} works", works.features.len());

        // Phase 3: Buffers
        let mut buffers = BufferSet::new();
        let created = resolve_buffers(&self.engine, self.matrix.catalogue(), &works.layer, &mut buffers, scope)?;
        tracing::info!("Created {} buffers", created);

        // Phase 4: Themes
        let mut passes = Vec::new();
        let mut results = BTreeMap::new();
        for theme in &settings.themes {
            let rows = self.run_theme(theme, &buffers, &mut passes, scope);
            results.insert(theme.clone(), rows);
        }

        // Phase 5: Reports
        let reports = ReportSet {
            prefix: report_prefix(settings.date_checked, settings.mode),
            works_layer: &works.layer,
            works: &works.features,
            results: &results,
        };
        let outputs = write_reports(&self.engine, &settings.output_dir, &reports)?;

        let total: usize = results.values().map(Vec::len).sum();
        let failed = passes.iter().filter(|p| matches!(p.status, PassStatus::Failed { .. })).count();
        let mut message = format!(
            "Checked {} works against {} themes: {} results",
            works.features.len(),
            results.len(),
            total
        );
        if failed > 0 {
            message.push_str(&format!(", {} failed passes", failed));
        }

        Ok(JobOutcome {
            run_id: run_id.to_string(),
            status: JobStatus::Success,
            message,
            mode: settings.mode,
            outputs,
            works: works.features.len(),
            passes,
            results,
        })
    }

    fn prepare_works(&self, scope: &mut TempDatasets<'_, E>) -> Result<PreparedWorks> {
        let settings = &self.settings;
        let fields = &settings.work_fields;

        if !self.engine.exists(&settings.works) {
            return Err(ValcheckError::DatasetNotFound { path: settings.works.clone() });
        }

        let opened = scope.track(self.engine.open(&settings.works)?);
        let mut layer = scope.track(self.engine.select(&opened, &format!("{} <> ''", fields.id))?);

        if let Some(district) = &settings.district {
            let clause = format!("{} = {}", fields.district, quote_literal(district));
            layer = scope.track(self.engine.select(&layer, &clause)?);
            tracing::info!("Filtered works to district {}", district);
        }

        let layer = scope.track(self.engine.add_geometry_fields(&layer)?);
        let available = self.engine.list_fields(&layer)?;
        let carried: Vec<String> = fields
            .carried()
            .into_iter()
            .filter(|f| available.iter().any(|a| a == f))
            .map(str::to_string)
            .collect();

        let features: Vec<WorkFeature> = self
            .engine
            .scan(&layer, &carried)?
            .into_iter()
            .filter_map(|row| {
                WorkFeature::from_row(fields, &row.attributes, Some(row.geometry), &row.measure)
            })
            .collect();

        if features.is_empty() {
            tracing::warn!("No works to evaluate in {}", settings.works.display());
        }

        Ok(PreparedWorks { layer, features })
    }

    fn run_theme(
        &self,
        theme: &Theme,
        buffers: &BufferSet,
        passes: &mut Vec<PassRecord>,
        scope: &mut TempDatasets<'_, E>,
    ) -> Vec<ValueResult> {
        let settings = &self.settings;

        if self.matrix.skips_theme(settings.mode, theme) {
            tracing::info!("Theme {} is not evaluated in {} mode", theme, settings.mode);
            return Vec::new();
        }
        let Some(datasets) = self.matrix.datasets_for(theme) else {
            tracing::warn!("Theme {} has no datasets in the matrix", theme);
            return Vec::new();
        };

        for rejected in self.matrix.rejected().iter().filter(|r| &r.theme == theme) {
            passes.push(PassRecord {
                theme: theme.clone(),
                dataset: rejected.dataset.clone(),
                buffer: None,
                status: PassStatus::Failed { reason: rejected.reason.clone() },
            });
        }

        let ctx = OverlayContext {
            path_aliases: &settings.path_aliases,
            work_fields: &settings.work_fields,
            lowest_risk: &settings.lowest_risk,
            date_checked: settings.date_checked,
        };

        let mut results = Vec::new();
        for spec in datasets {
            if !is_enabled(spec, settings.mode) {
                tracing::debug!("Dataset {} is not enabled in {} mode", spec.name, settings.mode);
                continue;
            }

            let classes = match resolve_buffer_classes(spec, settings.mode) {
                Ok(classes) => classes,
                Err(e) => {
                    tracing::error!("Skipping dataset {}: {}", spec.name, e);
                    passes.push(PassRecord {
                        theme: theme.clone(),
                        dataset: spec.name.clone(),
                        buffer: None,
                        status: PassStatus::Failed { reason: e.to_string() },
                    });
                    continue;
                }
            };

            tracing::info!("Processing {}/{} ({})", theme, spec.name, classes.join(", "));
            let evaluation = evaluate_dataset(&self.engine, &ctx, spec, &classes, buffers, scope);
            results.extend(evaluation.results);
            passes.extend(evaluation.passes);
        }

        for result in &mut results {
            apply_mitigation(&self.rules, &settings.lowest_risk, result);
            apply_identifiers(&self.rules, settings.mode, result);
        }

        tracing::info!("Theme {}: {} results", theme, results.len());
        results
    }
}
