use crate::output::OutputWriter;
use serde::Serialize;
use valcheck_core::DatasetMatrix;
use valcheck_engine::applicability::{is_enabled, resolve_buffer_classes};
use valcheck_engine::report::report_prefix;
use valcheck_engine::JobSettings;

/// Represents a planned action in dry-run mode
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub description: String,
    pub details: Vec<String>,
}

/// Types of actions that can be planned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PrepareWorkspace,
    PrepareWorks,
    CreateBuffer,
    Overlay,
    SkipDataset,
    WriteReport,
}

impl PlannedAction {
    /// Create a new planned action
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a detail to the planned action
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// Actions a job with these settings would take, without touching any data
pub fn plan_job(settings: &JobSettings, matrix: &DatasetMatrix) -> Vec<PlannedAction> {
    let mut actions = vec![
        PlannedAction::new(
            ActionType::PrepareWorkspace,
            format!("Prepare output directory {}", settings.output_dir.display()),
        )
        .with_detail("Create it, or remove previous *.json and *.geojson reports"),
    ];

    let mut works = PlannedAction::new(
        ActionType::PrepareWorks,
        format!("Prepare works from {}", settings.works.display()),
    )
    .with_detail(format!("Where {} <> ''", settings.work_fields.id));
    if let Some(district) = &settings.district {
        works = works.with_detail(format!("Only district {}", district));
    }
    actions.push(works);

    for spec in matrix.catalogue().specs() {
        actions.push(PlannedAction::new(
            ActionType::CreateBuffer,
            format!("Buffer {}: {} {} from {}", spec.name, spec.distance, spec.style, spec.source),
        ));
    }

    for theme in &settings.themes {
        if matrix.skips_theme(settings.mode, theme) {
            actions.push(PlannedAction::new(
                ActionType::SkipDataset,
                format!("Theme {} is not evaluated in {} mode", theme, settings.mode),
            ));
            continue;
        }
        for spec in matrix.datasets_for(theme).unwrap_or_default() {
            if !is_enabled(spec, settings.mode) {
                continue;
            }
            let action = match resolve_buffer_classes(spec, settings.mode) {
                Ok(classes) => {
                    let mut action = PlannedAction::new(
                        ActionType::Overlay,
                        format!("Overlay {}/{} at {}", theme, spec.name, classes.join(", ")),
                    )
                    .with_detail(format!("Source: {}", spec.path_template));
                    if let Some(clause) = &spec.where_clause {
                        action = action.with_detail(format!("Where: {}", clause));
                    }
                    if spec.high_risk_only {
                        action = action
                            .with_detail(format!("Excluding {} works", settings.lowest_risk));
                    }
                    action
                }
                Err(e) => PlannedAction::new(
                    ActionType::SkipDataset,
                    format!("Skip {}/{}: {}", theme, spec.name, e),
                ),
            };
            actions.push(action);
        }
    }

    let prefix = report_prefix(settings.date_checked, settings.mode);
    actions.push(
        PlannedAction::new(ActionType::WriteReport, "Write reports")
            .with_detail(format!("{}_<theme>_values.json for each theme with results", prefix))
            .with_detail(format!("{}_works_detail.json", prefix))
            .with_detail(format!("{}_works.geojson", prefix)),
    );

    actions
}

/// Display planned actions in dry-run mode
pub fn display_planned_actions(output: &OutputWriter, actions: &[PlannedAction]) -> anyhow::Result<()> {
    if output.is_json() {
        return output.result(
            "success",
            &serde_json::json!({
                "dry_run": true,
                "planned_actions": actions,
            }),
        );
    }

    output.section("Planned Actions (Dry Run)");
    for (i, action) in actions.iter().enumerate() {
        output.info(format!("{}. {:?}: {}", i + 1, action.action_type, action.description));
        for detail in &action.details {
            output.info(format!("   - {}", detail));
        }
    }
    output.info("No data was read or written. Run without --dry-run to execute these actions.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use valcheck_core::models::{Mode, Theme, WorkFields};

    fn settings(mode: Mode, themes: Vec<Theme>) -> JobSettings {
        JobSettings {
            mode,
            themes,
            works: PathBuf::from("works.geojson"),
            output_dir: PathBuf::from("reports"),
            district: Some("Tambo".to_string()),
            path_aliases: Default::default(),
            work_fields: WorkFields::default(),
            lowest_risk: "LRLI".to_string(),
            date_checked: NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
        }
    }

    #[test]
    fn test_planned_action_creation() {
        let action = PlannedAction::new(ActionType::CreateBuffer, "Buffer 1m")
            .with_detail("Source: works")
            .with_detail("Style: full");

        assert_eq!(action.description, "Buffer 1m");
        assert_eq!(action.details.len(), 2);
    }

    #[test]
    fn test_action_type_serialization() {
        let action = PlannedAction::new(ActionType::WriteReport, "Write reports");
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("write_report"));
    }

    #[test]
    fn test_plan_covers_catalogue_and_skipped_themes() {
        let matrix = DatasetMatrix::builtin().unwrap();
        let actions = plan_job(&settings(Mode::Lrli, vec![Theme::Heritage, Theme::Water]), &matrix);

        let buffers = actions.iter().filter(|a| a.action_type == ActionType::CreateBuffer).count();
        assert_eq!(buffers, matrix.catalogue().len());
        assert!(actions
            .iter()
            .any(|a| a.description == "Theme heritage is not evaluated in LRLI mode"));
        assert!(actions.iter().any(|a| a.description.starts_with("Overlay water/")));
        assert!(actions[1].details.iter().any(|d| d == "Only district Tambo"));
    }

    #[test]
    fn test_plan_lists_each_ring_pass() {
        let matrix = DatasetMatrix::builtin().unwrap();
        let actions = plan_job(&settings(Mode::Jfmp, vec![Theme::Biodiversity]), &matrix);
        assert!(actions
            .iter()
            .any(|a| a.description == "Overlay biodiversity/vba_fauna_restricted at 500m, 1000m_ring"));
    }
}
