//! Per-mode applicability of matrix datasets.

use valcheck_core::models::{BufferSelection, DatasetSpec, Mode};
use valcheck_core::{Result, ValcheckError};

/// Whether a dataset is evaluated at all in a mode
pub fn is_enabled(spec: &DatasetSpec, mode: Mode) -> bool {
    spec.modes.is_empty() || spec.modes.contains(&mode)
}

/// Buffer classes to overlay for a dataset in a mode, one pass each.
///
/// A mode-keyed map without an entry for `mode` is a configuration error;
/// there is no fallback class.
pub fn resolve_buffer_classes(spec: &DatasetSpec, mode: Mode) -> Result<Vec<String>> {
    let missing = || ValcheckError::MissingModeBuffer { dataset: spec.name.clone(), mode: mode.to_string() };

    match &spec.buffer {
        BufferSelection::Fixed(class) => Ok(vec![class.clone()]),
        BufferSelection::PerMode(map) => map.get(&mode).map(|c| vec![c.clone()]).ok_or_else(missing),
        BufferSelection::PerModeMulti(map) => {
            let classes = map.get(&mode).ok_or_else(missing)?;
            if classes.is_empty() {
                return Err(missing());
            }
            let mut unique: Vec<String> = Vec::with_capacity(classes.len());
            for class in classes {
                if !unique.contains(class) {
                    unique.push(class.clone());
                }
            }
            Ok(unique)
        }
    }
}

/// Whether lowest-risk works are excluded from the works side of the overlay
pub fn needs_high_risk_exclusion(spec: &DatasetSpec) -> bool {
    spec.high_risk_only
}
