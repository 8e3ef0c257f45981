//! Atom validation: header fields and per-type parameter checks.

use crate::schema::*;

use super::condition_checks::validate_condition;
use super::fuzzy::{fuzzy_match, is_kebab_case, is_path_safe, is_semver};
use super::ValidationResult;

pub(super) fn validate_header(atom: &EligibilityAtom, result: &mut ValidationResult) {
    if atom.api_version != "v1" {
        result.error(
            "apiVersion",
            format!("apiVersion must be 'v1', got '{}'", atom.api_version),
        );
    }
    if atom.kind != RuleKind::EligibilityAtom.as_str() {
        result.error(
            "kind",
            format!("kind must be 'EligibilityAtom', got '{}'", atom.kind),
        );
    }

    let id = &atom.metadata.id;
    if id.trim().is_empty() {
        result.error("metadata.id", "atom id must not be empty");
    } else if !is_path_safe(id) {
        result.error(
            "metadata.id",
            format!("id '{}' must not contain '/', '\\', '..' or start with '.'", id),
        );
    } else if !is_kebab_case(id) {
        result.warn(
            "metadata.id",
            format!("id should be kebab-case (lowercase alphanumeric + hyphens), got '{}'", id),
        );
    }
    if atom.metadata.name.trim().is_empty() {
        result.error("metadata.name", "atom name must not be empty");
    }
    if !is_semver(&atom.version) {
        result.warn(
            "version",
            format!("version '{}' is not MAJOR.MINOR.PATCH", atom.version),
        );
    }
}

/// Check parameter values that the type system cannot express.
pub(crate) fn validate_parameters(params: &AtomParameters, path: &str, result: &mut ValidationResult) {
    match params {
        AtomParameters::AgeRange { field, min_age, max_age } => {
            check_field(field, path, result);
            check_finite(*min_age, &format!("{path}.min_age"), result);
            check_finite(*max_age, &format!("{path}.max_age"), result);
            if *min_age < 0.0 {
                result.error(format!("{path}.min_age"), "min_age must not be negative");
            }
            if min_age > max_age {
                result.error(
                    format!("{path}.min_age"),
                    format!("min_age ({}) must be <= max_age ({})", min_age, max_age),
                );
            }
        }
        AtomParameters::Geography { field, regions } => {
            check_field(field, path, result);
            check_list(regions, &format!("{path}.regions"), result);
        }
        AtomParameters::Tenure { field, min_months } => {
            check_field(field, path, result);
            check_finite(*min_months, &format!("{path}.min_months"), result);
            if *min_months < 0.0 {
                result.error(format!("{path}.min_months"), "min_months must not be negative");
            }
        }
        AtomParameters::Segment { field, segments } => {
            check_field(field, path, result);
            check_list(segments, &format!("{path}.segments"), result);
        }
        AtomParameters::TimeOfDay { field, start_hour, end_hour } => {
            check_field(field, path, result);
            for (name, hour) in [("start_hour", start_hour), ("end_hour", end_hour)] {
                if *hour > 23 {
                    result.error(format!("{path}.{name}"), format!("{name} must be within 0..=23, got {hour}"));
                }
            }
            if start_hour > end_hour {
                result.error(
                    format!("{path}.start_hour"),
                    format!("start_hour ({}) must be <= end_hour ({})", start_hour, end_hour),
                );
            }
        }
        AtomParameters::DeviceType { field, devices } => {
            check_field(field, path, result);
            check_list(devices, &format!("{path}.devices"), result);
        }
        AtomParameters::Consent { field, .. } => check_field(field, path, result),
        AtomParameters::PurchaseFrequency { field, threshold, period } => {
            check_field(field, path, result);
            check_finite(*threshold, &format!("{path}.threshold"), result);
            if *threshold < 0.0 {
                result.error(format!("{path}.threshold"), "threshold must not be negative");
            }
            const PERIODS: &[&str] = &["daily", "weekly", "monthly", "quarterly", "yearly"];
            if !PERIODS.contains(&period.as_str()) {
                let msg = format!("unknown period '{}'", period);
                match fuzzy_match(period, PERIODS) {
                    Some(s) => result.error_with_suggestion(
                        format!("{path}.period"),
                        msg,
                        format!("Did you mean '{}'?", s),
                    ),
                    None => result.error(format!("{path}.period"), msg),
                }
            }
        }
        AtomParameters::EngagementScore { field, min_score } => {
            check_field(field, path, result);
            check_unit(*min_score, &format!("{path}.min_score"), result);
        }
        AtomParameters::ChurnRisk { field, max_risk } => {
            check_field(field, path, result);
            check_unit(*max_risk, &format!("{path}.max_risk"), result);
        }
        AtomParameters::WeatherImpact { field, conditions } => {
            check_field(field, path, result);
            check_list(conditions, &format!("{path}.conditions"), result);
        }
        AtomParameters::BehaviorPattern { field, pattern } => {
            check_field(field, path, result);
            if pattern.trim().is_empty() {
                result.error(format!("{path}.pattern"), "pattern must not be empty");
            }
        }
        AtomParameters::Custom { conditions } => {
            if conditions.is_empty() {
                result.error(format!("{path}.conditions"), "custom atom needs at least one condition");
            }
            for (i, cond) in conditions.iter().enumerate() {
                validate_condition(cond, &format!("{path}.conditions[{i}]"), result);
            }
        }
    }
}

/// Validate an untyped parameter bag for the named atom type.
///
/// `parameters` is the JSON object without its `type` key; a `type` key, if
/// present, must agree with `atom_type`.
pub fn validate_raw_parameters(atom_type: &str, parameters: &serde_json::Value) -> ValidationResult {
    let mut result = ValidationResult::new();

    let ty: AtomType = match atom_type.parse() {
        Ok(t) => t,
        Err(e) => {
            let names: Vec<&str> = AtomType::ALL.iter().map(|t| t.as_str()).collect();
            match fuzzy_match(atom_type, &names) {
                Some(s) => result.error_with_suggestion("type", e, format!("Did you mean '{}'?", s)),
                None => result.error("type", e),
            }
            return result;
        }
    };

    let mut bag = match parameters {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => serde_json::Map::new(),
        _ => {
            result.error("parameters", "parameters must be an object");
            return result;
        }
    };
    if let Some(existing) = bag.get("type").and_then(|v| v.as_str()) {
        if existing != ty.as_str() {
            result.error(
                "parameters.type",
                format!("type '{}' does not match atom type '{}'", existing, ty),
            );
            return result;
        }
    }
    bag.insert("type".to_string(), serde_json::Value::String(ty.as_str().to_string()));

    match serde_json::from_value::<AtomParameters>(serde_json::Value::Object(bag)) {
        Ok(params) => validate_parameters(&params, "parameters", &mut result),
        Err(e) => result.error("parameters", format!("invalid {} parameters: {}", ty, e)),
    }
    result
}

fn check_field(field: &Option<String>, path: &str, result: &mut ValidationResult) {
    if let Some(f) = field {
        if f.trim().is_empty() || f.split('.').any(str::is_empty) {
            result.error(format!("{path}.field"), format!("invalid field path '{}'", f));
        }
    }
}

fn check_finite(v: f64, path: &str, result: &mut ValidationResult) {
    if !v.is_finite() {
        result.error(path, "value must be a finite number");
    }
}

fn check_unit(v: f64, path: &str, result: &mut ValidationResult) {
    if !(0.0..=1.0).contains(&v) {
        result.error(path, format!("value must be within [0, 1], got {}", v));
    }
}

fn check_list(items: &[String], path: &str, result: &mut ValidationResult) {
    if items.is_empty() {
        result.error(path, "list must not be empty");
    }
    if let Some(i) = items.iter().position(|s| s.trim().is_empty()) {
        result.error(format!("{path}[{i}]"), "entry must not be blank");
    }
}
