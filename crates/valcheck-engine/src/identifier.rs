//! Result identifiers (QBID).
//!
//! A QBID is the `|`-joined text of an ordered field list, skipping fields
//! that are null, blank or zero. Derivation never fails: a missing recipe or
//! an unknown field falls back to the generic list, and an empty identifier
//! falls back to the bare work id.

use valcheck_core::models::{Mode, Theme, ValueResult};
use valcheck_core::RuleTables;

pub const SEPARATOR: &str = "|";

/// Join the named fields, or `None` when a field is not a result column
pub fn join_fields(result: &ValueResult, fields: &[String]) -> Option<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for name in fields {
        let value = result.field(name)?;
        if value.is_blank() {
            continue;
        }
        parts.push(value.as_text());
    }
    Some(parts.join(SEPARATOR))
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.is_empty())
}

/// Primary identifier for a result in a mode
pub fn build_identifier(rules: &RuleTables, result: &ValueResult, mode: Mode, theme: &Theme) -> String {
    let primary = rules
        .identifier_fields(mode, theme)
        .and_then(|fields| non_empty(join_fields(result, fields)));
    if let Some(id) = primary {
        return id;
    }

    tracing::debug!("No primary identifier for {} in {} mode, using fallback fields", theme, mode);
    non_empty(join_fields(result, &rules.identifiers.fallback)).unwrap_or_else(|| result.work_id.clone())
}

/// Alternate identifier from the fixed alternate field list
pub fn build_alternate_identifier(rules: &RuleTables, result: &ValueResult) -> String {
    non_empty(join_fields(result, &rules.identifiers.alternate)).unwrap_or_else(|| result.work_id.clone())
}

/// Set both identifier columns of a result
pub fn apply_identifiers(rules: &RuleTables, mode: Mode, result: &mut ValueResult) {
    let theme = result.theme.clone();
    result.qbid = Some(build_identifier(rules, result, mode, &theme));
    result.qbid_alt = Some(build_alternate_identifier(rules, result));
}
