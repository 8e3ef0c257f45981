//! Leaf condition checks: field path, value shape per operator, weight.

use serde_json::Value;

use crate::schema::{range_bounds, Condition, ConditionOperator};

use super::ValidationResult;

pub(crate) fn validate_condition(cond: &Condition, path: &str, result: &mut ValidationResult) {
    if cond.field.trim().is_empty() {
        result.error(format!("{path}.field"), "field must not be empty");
    } else if cond.field.split('.').any(str::is_empty) {
        result.error(
            format!("{path}.field"),
            format!("field path '{}' has an empty segment", cond.field),
        );
    }

    let value_path = format!("{path}.value");
    match cond.operator {
        ConditionOperator::Equals | ConditionOperator::Contains => {
            if !is_scalar(&cond.value) {
                result.error(
                    value_path,
                    format!("'{}' expects a string, number or boolean", cond.operator),
                );
            }
        }
        ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
            if !cond.value.as_f64().is_some_and(f64::is_finite) {
                result.error(value_path, format!("'{}' expects a number", cond.operator));
            }
        }
        ConditionOperator::InRange => match &cond.value {
            Value::Array(items) if items.is_empty() => {
                result.error(value_path, "'in_range' expects a non-empty set");
            }
            Value::Array(items) => {
                if let Some(i) = items.iter().position(|v| !is_scalar(v)) {
                    result.error(format!("{value_path}[{i}]"), "set members must be scalars");
                }
            }
            _ => result.error(value_path, "'in_range' expects an array of allowed values"),
        },
        ConditionOperator::Between => match range_bounds(&cond.value) {
            Some((min, max)) if min > max => {
                result.error(value_path, format!("range min ({}) must be <= max ({})", min, max));
            }
            Some(_) => {}
            None => result.error(value_path, "'between' expects [min, max] or {min, max} with numbers"),
        },
    }

    if let Some(w) = cond.weight {
        if !w.is_finite() || w < 0.0 {
            result.error(format!("{path}.weight"), format!("weight must be a finite number >= 0, got {}", w));
        }
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}
