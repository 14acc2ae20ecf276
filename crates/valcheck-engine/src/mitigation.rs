//! Mitigation advice dispatched on the result theme.

use valcheck_core::models::{Theme, ValueResult};
use valcheck_core::RuleTables;

/// Risk level assumed for heritage lookups when a work has none
const DEFAULT_HERITAGE_RISK: &str = "DAP";

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Heritage lookup key: (risk level, known sites, cultural sensitivity)
pub fn heritage_key(result: &ValueResult) -> (String, &'static str, &'static str) {
    let risk = match result.risk_level.trim() {
        "" => DEFAULT_HERITAGE_RISK.to_string(),
        risk => risk.to_string(),
    };
    let sites = result.value_id.as_ref().is_some_and(|id| !id.is_blank());
    let sensitive = result
        .sensitivity
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("yes"));
    (risk, yes_no(sites), yes_no(sensitive))
}

/// Native title advice from the status column and the work's risk level
pub fn native_title_advice<'r>(rules: &'r RuleTables, lowest_risk: &str, result: &ValueResult) -> &'r str {
    let advice = &rules.native_title;
    let status = result
        .field(&advice.status_field)
        .map(|v| v.as_text().to_uppercase())
        .unwrap_or_default();

    if status.contains("EXTINGUISHED") {
        &advice.extinguished
    } else if result.risk_level == lowest_risk {
        &advice.low_impact
    } else {
        &advice.consult
    }
}

/// Mitigation text for a result
pub fn mitigation_for<'r>(rules: &'r RuleTables, lowest_risk: &str, result: &ValueResult) -> &'r str {
    match &result.theme {
        Theme::Forests => rules.forest_advice(&result.value_type),
        Theme::Heritage => {
            let (risk, sites, sensitivity) = heritage_key(result);
            rules.heritage_advice(&risk, sites, sensitivity)
        }
        Theme::Summary => native_title_advice(rules, lowest_risk, result),
        Theme::Biodiversity => &rules.advice.biodiversity,
        Theme::Water => &rules.advice.water,
        Theme::Other(_) => &rules.advice.default,
    }
}

/// Set the `mitigation` column of a result
pub fn apply_mitigation(rules: &RuleTables, lowest_risk: &str, result: &mut ValueResult) {
    let advice = mitigation_for(rules, lowest_risk, result).to_string();
    result.mitigation = Some(advice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_result;
    use valcheck_core::models::AttributeValue;

    #[test]
    fn test_forest_advice_by_value_type() {
        let rules = RuleTables::builtin().unwrap();
        let mut result = sample_result(Theme::Forests);
        result.value_type = "Apiary Site".to_string();
        apply_mitigation(&rules, "LRLI", &mut result);
        assert_eq!(
            result.mitigation.as_deref(),
            Some("Ensure no negative impacts on apiary operations, contact licensee via Land Folio")
        );

        result.value_type = "Something New".to_string();
        apply_mitigation(&rules, "LRLI", &mut result);
        assert_eq!(result.mitigation.as_deref(), Some("Standard work practices apply"));
    }

    #[test]
    fn test_heritage_sites_and_sensitivity() {
        let rules = RuleTables::builtin().unwrap();
        let mut result = sample_result(Theme::Heritage);
        result.risk_level = "DAP".to_string();
        result.value_id = Some(AttributeValue::text("7822-0001"));
        result.sensitivity = Some("Yes".to_string());

        apply_mitigation(&rules, "LRLI", &mut result);
        assert_eq!(
            result.mitigation.as_deref(),
            Some("Sites and sensitivity detected. Heritage specialist assessment required. Permit if harm unavoidable")
        );
    }

    #[test]
    fn test_heritage_defaults() {
        let rules = RuleTables::builtin().unwrap();
        let mut result = sample_result(Theme::Heritage);
        result.risk_level = String::new();
        result.value_id = Some(AttributeValue::text(" "));
        result.sensitivity = None;
        assert_eq!(heritage_key(&result), ("DAP".to_string(), "No", "No"));

        result.risk_level = "NBFT".to_string();
        apply_mitigation(&rules, "LRLI", &mut result);
        assert_eq!(result.mitigation.as_deref(), Some("Heritage assessment required"));
    }

    #[test]
    fn test_native_title_chain() {
        let rules = RuleTables::builtin().unwrap();
        let mut result = sample_result(Theme::Summary);
        result.risk_level = "LRLI".to_string();
        result.value_description = Some(AttributeValue::text("Native Title Extinguished"));
        assert_eq!(
            mitigation_for(&rules, "LRLI", &result),
            "Native Title Extinguished - No Procedural Rights Observed"
        );

        result.value_description = Some(AttributeValue::text("Determined - Exists"));
        assert_eq!(
            mitigation_for(&rules, "LRLI", &result),
            "Low Impact/Exempt Activity - Assessment Not Required"
        );

        result.risk_level = "DAP".to_string();
        assert_eq!(mitigation_for(&rules, "LRLI", &result), "Seek Further Advice - Consult NT Assessor");
    }

    #[test]
    fn test_constant_advice() {
        let rules = RuleTables::builtin().unwrap();
        let water = sample_result(Theme::Water);
        assert_eq!(mitigation_for(&rules, "LRLI", &water), rules.advice.water);
        let other = sample_result(Theme::Other("roads".to_string()));
        assert_eq!(mitigation_for(&rules, "LRLI", &other), "Standard work practices apply");
    }
}
