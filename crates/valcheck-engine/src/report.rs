//! Output workspace and report files.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use valcheck_core::models::{Mode, Theme, ValueResult, WorkFeature};
use valcheck_core::{GeometryEngine, LayerHandle, Result, ValcheckError};

/// Extensions of files owned by a previous run
const REPORT_EXTENSIONS: [&str; 2] = ["json", "geojson"];

fn workspace_error(path: &Path, reason: impl std::fmt::Display) -> ValcheckError {
    ValcheckError::Workspace { path: path.to_path_buf(), reason: reason.to_string() }
}

/// Create the output directory, or clear previous reports from it
pub fn prepare_workspace(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| workspace_error(dir, e))?;
        tracing::info!("Created output directory {}", dir.display());
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(workspace_error(dir, "output path is not a directory"));
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(|e| workspace_error(dir, e))? {
        let path = entry.map_err(|e| workspace_error(dir, e))?.path();
        let is_report = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| REPORT_EXTENSIONS.contains(&ext));
        if path.is_file() && is_report {
            fs::remove_file(&path).map_err(|e| workspace_error(&path, e))?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!("Cleared {} previous outputs from {}", removed, dir.display());
    }
    Ok(())
}

/// `{YYYYMMDD}_{MODE}` prefix shared by every output of a run
pub fn report_prefix(date: NaiveDate, mode: Mode) -> String {
    format!("{}_{}", date.format("%Y%m%d"), mode.as_str())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| ValcheckError::Serialization(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Everything a finished job writes
pub struct ReportSet<'a> {
    pub prefix: String,
    pub works_layer: &'a LayerHandle,
    pub works: &'a [WorkFeature],
    pub results: &'a BTreeMap<Theme, Vec<ValueResult>>,
}

/// Write the theme tables, the works detail and the works layer copy.
///
/// Themes without results get no table. Returns the written paths.
pub fn write_reports<E: GeometryEngine + ?Sized>(
    engine: &E,
    dir: &Path,
    reports: &ReportSet<'_>,
) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::new();

    for (theme, rows) in reports.results {
        if rows.is_empty() {
            continue;
        }
        let path = dir.join(format!("{}_{}_values.json", reports.prefix, theme.as_str()));
        write_json(&path, rows)?;
        tracing::info!("Wrote {} {} results to {}", rows.len(), theme, path.display());
        outputs.push(path);
    }

    let detail = dir.join(format!("{}_works_detail.json", reports.prefix));
    write_json(&detail, reports.works)?;
    outputs.push(detail);

    let layer = dir.join(format!("{}_works.geojson", reports.prefix));
    engine.export(reports.works_layer, &layer)?;
    outputs.push(layer);

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefix() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(report_prefix(date, Mode::Nbft), "20250309_NBFT");
    }

    #[test]
    fn test_workspace_is_created() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out").join("reports");
        prepare_workspace(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_workspace_clears_previous_reports_only() {
        let temp = TempDir::new().unwrap();
        for name in ["old_values.json", "old_works.geojson", "notes.txt"] {
            fs::write(temp.path().join(name), "{}").unwrap();
        }
        prepare_workspace(temp.path()).unwrap();

        let remaining: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining, vec!["notes.txt"]);
    }

    #[test]
    fn test_workspace_on_a_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("taken");
        fs::write(&file, "").unwrap();
        let err = prepare_workspace(&file).unwrap_err();
        assert!(err.is_fatal());
    }
}
