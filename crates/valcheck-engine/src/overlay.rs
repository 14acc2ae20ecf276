//! Overlay & Extraction Engine.
//!
//! Evaluates one dataset against the materialised buffers: the values side is
//! prepared once, then each resolved buffer class gets its own overlay pass.
//! Nothing here aborts a job; every failure is logged and recorded against
//! the dataset or pass it happened in.

use crate::buffers::BufferSet;
use crate::models::{PassRecord, PassStatus};
use crate::scope::TempDatasets;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;
use valcheck_core::models::{
    AttributeValue, Attributes, DatasetSpec, PathAliases, ValueField, ValueResult, WorkFields,
    FIELD_NOT_FOUND,
};
use valcheck_core::{engine_error, GeometryEngine, LayerHandle, Result, Row};

/// Minimum retained fields for a pass to be worth reporting
const MIN_RETAINED_FIELDS: usize = 3;

/// Job-wide inputs to every overlay pass
#[derive(Debug, Clone)]
pub struct OverlayContext<'a> {
    pub path_aliases: &'a PathAliases,
    pub work_fields: &'a WorkFields,
    pub lowest_risk: &'a str,
    pub date_checked: NaiveDate,
}

/// Results and pass records of one dataset
#[derive(Debug, Default)]
pub struct DatasetEvaluation {
    pub results: Vec<ValueResult>,
    pub passes: Vec<PassRecord>,
}

impl DatasetEvaluation {
    fn record(&mut self, spec: &DatasetSpec, buffer: Option<&str>, status: PassStatus) {
        self.passes.push(PassRecord {
            theme: spec.theme.clone(),
            dataset: spec.name.clone(),
            buffer: buffer.map(str::to_string),
            status,
        });
    }
}

/// Quote a text literal for a where clause
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Where clause keeping works that are not in the lowest-risk category
pub fn high_risk_clause(risk_field: &str, lowest_risk: &str) -> String {
    format!("{f} IS NULL OR {f} <> {v}", f = risk_field, v = quote_literal(lowest_risk))
}

/// Evaluate a dataset once per buffer class
pub fn evaluate_dataset<E: GeometryEngine + ?Sized>(
    engine: &E,
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    classes: &[String],
    buffers: &BufferSet,
    scope: &mut TempDatasets<'_, E>,
) -> DatasetEvaluation {
    let mut evaluation = DatasetEvaluation::default();

    let values = match prepare_values(engine, ctx, spec, scope) {
        Ok(Some(values)) => values,
        Ok(None) => {
            evaluation.record(spec, None, PassStatus::Skipped { reason: "dataset not found".into() });
            return evaluation;
        }
        Err(e) => {
            tracing::error!("Dataset {} failed: {}", spec.name, e);
            evaluation.record(spec, None, PassStatus::Failed { reason: e.to_string() });
            return evaluation;
        }
    };

    for class in classes {
        let Some(buffer) = buffers.get(class) else {
            let reason = format!("buffer class '{}' was not built", class);
            tracing::error!("Dataset {}: {}", spec.name, reason);
            evaluation.record(spec, Some(class), PassStatus::Failed { reason });
            continue;
        };

        match run_pass(engine, ctx, spec, class, buffer, &values, scope) {
            Ok(PassOutput::Results(results)) => {
                tracing::info!("{} @ {}: {} results", spec.name, class, results.len());
                let count = results.len();
                evaluation.results.extend(results);
                evaluation.record(spec, Some(class), PassStatus::Completed { results: count });
            }
            Ok(PassOutput::Skipped(reason)) => {
                tracing::warn!("Skipping {} @ {}: {}", spec.name, class, reason);
                evaluation.record(spec, Some(class), PassStatus::Skipped { reason });
            }
            Err(e) => {
                tracing::error!("Overlay of {} @ {} failed: {}", spec.name, class, e);
                evaluation.record(spec, Some(class), PassStatus::Failed { reason: e.to_string() });
            }
        }
    }

    evaluation
}

/// Open the values dataset and apply its where clause; `None` when the
/// dataset does not exist
fn prepare_values<E: GeometryEngine + ?Sized>(
    engine: &E,
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    scope: &mut TempDatasets<'_, E>,
) -> Result<Option<LayerHandle>> {
    let path = spec.resolve_path(ctx.path_aliases)?;
    if !engine.exists(Path::new(&path)) {
        tracing::warn!("Dataset not found: {}", path);
        return Ok(None);
    }

    let opened = scope.track(engine.open(Path::new(&path))?);
    match &spec.where_clause {
        Some(clause) => {
            tracing::debug!("Selecting {} where {}", spec.name, clause);
            Ok(Some(scope.track(engine.select(&opened, clause)?)))
        }
        None => Ok(Some(opened)),
    }
}

enum PassOutput {
    Results(Vec<ValueResult>),
    Skipped(String),
}

fn run_pass<E: GeometryEngine + ?Sized>(
    engine: &E,
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    class: &str,
    buffer: &LayerHandle,
    values: &LayerHandle,
    scope: &mut TempDatasets<'_, E>,
) -> Result<PassOutput> {
    let works_side = if spec.high_risk_only {
        let clause = high_risk_clause(&ctx.work_fields.risk, ctx.lowest_risk);
        scope.track(engine.select(buffer, &clause)?)
    } else {
        buffer.clone()
    };

    let works_count = engine.count(&works_side)?;
    let values_count = engine.count(values)?;
    if works_count == 0 || values_count == 0 {
        return Ok(PassOutput::Skipped(format!(
            "empty selection ({} works, {} values)",
            works_count, values_count
        )));
    }

    match engine.intersect(&[&works_side, values]) {
        Ok(handle) => {
            let overlay = scope.track(handle);
            dissolve_overlay(engine, ctx, spec, class, &overlay, scope)
        }
        Err(e) => {
            tracing::warn!("Intersect failed for {} @ {}, clipping per work: {}", spec.name, class, e);
            clip_per_work(engine, ctx, spec, class, &works_side, values, scope)
        }
    }
}

fn dissolve_overlay<E: GeometryEngine + ?Sized>(
    engine: &E,
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    class: &str,
    overlay: &LayerHandle,
    scope: &mut TempDatasets<'_, E>,
) -> Result<PassOutput> {
    let available = engine.list_fields(overlay)?;
    let retained = retained_fields(ctx.work_fields, spec, &available);
    if retained.len() < MIN_RETAINED_FIELDS {
        return Ok(PassOutput::Skipped(format!(
            "insufficient fields in overlay output ({} retained)",
            retained.len()
        )));
    }

    let dissolved = scope.track(engine.dissolve(overlay, &retained)?);
    let rows = engine.scan(&dissolved, &retained)?;
    let results = rows
        .iter()
        .filter_map(|row| build_result(ctx, spec, class, row))
        .collect();
    Ok(PassOutput::Results(results))
}

/// Clip the values by each work on its own and stamp that work's attributes
/// onto the clipped rows, since clip output carries values attributes only
fn clip_per_work<E: GeometryEngine + ?Sized>(
    engine: &E,
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    class: &str,
    works_side: &LayerHandle,
    values: &LayerHandle,
    scope: &mut TempDatasets<'_, E>,
) -> Result<PassOutput> {
    let id_field = &ctx.work_fields.id;
    let work_available = engine.list_fields(works_side)?;
    if !work_available.iter().any(|f| f == id_field) {
        return Err(engine_error("clip", format!("works layer has no '{}' field", id_field)));
    }
    let mut work_retained: Vec<String> = Vec::new();
    for name in ctx.work_fields.carried() {
        if work_available.iter().any(|a| a == name) && !work_retained.iter().any(|r| r == name) {
            work_retained.push(name.to_string());
        }
    }

    let value_available = engine.list_fields(values)?;
    let value_retained: Vec<String> = spec
        .fields
        .iter()
        .filter(|f| value_available.contains(f) && !work_retained.contains(f))
        .cloned()
        .collect();
    let retained = work_retained.len() + value_retained.len();
    if retained < MIN_RETAINED_FIELDS {
        return Ok(PassOutput::Skipped(format!(
            "insufficient fields in overlay output ({} retained)",
            retained
        )));
    }

    let mut seen = BTreeSet::new();
    let mut results = Vec::new();
    for work in engine.scan(works_side, &work_retained)? {
        let work_id = work.attributes.get(id_field).map(AttributeValue::as_text).unwrap_or_default();
        if work_id.trim().is_empty() || !seen.insert(work_id.clone()) {
            continue;
        }

        let clause = format!("{} = {}", id_field, quote_literal(&work_id));
        let single = scope.track(engine.select(works_side, &clause)?);
        let clipped = scope.track(engine.clip(values, &single)?);
        if engine.count(&clipped)? == 0 {
            continue;
        }

        let dissolved = scope.track(engine.dissolve(&clipped, &value_retained)?);
        for mut row in engine.scan(&dissolved, &value_retained)? {
            row.attributes.extend(work.attributes.clone());
            results.extend(build_result(ctx, spec, class, &row));
        }
    }
    tracing::debug!("Clip fallback for {} @ {} covered {} works", spec.name, class, seen.len());
    Ok(PassOutput::Results(results))
}

/// Carried work fields then configured dataset fields, each kept only when
/// present in the overlay output
pub fn retained_fields(work_fields: &WorkFields, spec: &DatasetSpec, available: &[String]) -> Vec<String> {
    let mut retained: Vec<String> = Vec::new();
    let candidates = work_fields.carried().into_iter().chain(spec.fields.iter().map(String::as_str));
    for name in candidates {
        if available.iter().any(|a| a == name) && !retained.iter().any(|r| r == name) {
            retained.push(name.to_string());
        }
    }
    retained
}

fn lookup(attributes: &Attributes, name: &str) -> AttributeValue {
    attributes.get(name).cloned().unwrap_or_else(|| AttributeValue::text(FIELD_NOT_FOUND))
}

/// The reported `Value` of a row
pub fn extract_value(value_field: Option<&ValueField>, attributes: &Attributes) -> AttributeValue {
    match value_field {
        None => AttributeValue::Null,
        Some(ValueField::Single(name)) => lookup(attributes, name),
        Some(ValueField::Concat(names)) => {
            let parts: Vec<String> = names.iter().map(|n| lookup(attributes, n).as_text()).collect();
            AttributeValue::Text(parts.join(ValueField::SEPARATOR))
        }
    }
}

/// One result per dissolved row; rows without a work identifier yield `None`
pub fn build_result(
    ctx: &OverlayContext<'_>,
    spec: &DatasetSpec,
    buffer: &str,
    row: &Row,
) -> Option<ValueResult> {
    let attributes = &row.attributes;
    let text = |name: &str| attributes.get(name).map(AttributeValue::as_text).unwrap_or_default();
    let fields = ctx.work_fields;

    let work_id = text(&fields.id);
    if work_id.trim().is_empty() {
        return None;
    }

    let extra = spec
        .extra_columns()
        .into_iter()
        .map(|(field, column)| (column.to_string(), lookup(attributes, field)))
        .collect();

    Some(ValueResult {
        work_id,
        work_name: text(&fields.name),
        work_description: text(&fields.description),
        district: text(&fields.district),
        risk_level: text(&fields.risk),
        sensitivity: attributes
            .get(&fields.sensitivity)
            .filter(|v| !v.is_blank())
            .map(AttributeValue::as_text),
        theme: spec.theme.clone(),
        dataset: spec.name.clone(),
        value_type: spec.value_type.clone(),
        buffer: buffer.to_string(),
        value: extract_value(spec.value_field.as_ref(), attributes),
        value_description: spec.description_field.as_deref().map(|f| lookup(attributes, f)),
        value_id: spec.id_field.as_deref().map(|f| lookup(attributes, f)),
        x: row.measure.x,
        y: row.measure.y,
        area_ha: row.measure.area_ha,
        length_km: row.measure.length_km,
        date_checked: ctx.date_checked,
        extra,
        mitigation: None,
        qbid: None,
        qbid_alt: None,
    })
}
