//! Leaf condition types: a single `field <operator> value` test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One leaf test within a rule.
///
/// `value` is deliberately untyped: its valid shape depends on `operator`
/// and is enforced by validation when a document is saved or loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Dotted path into the subject record, e.g. `profile.address.country`.
    pub field: String,
    pub operator: ConditionOperator,
    pub value: serde_json::Value,
    /// Contribution to the decision's weighted score. Never affects pass/fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Weight used for scoring (`1.0` when unset).
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Comparison operators available to conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    /// Set membership: `value` is an array, the subject value must be one of its members.
    InRange,
    /// Inclusive numeric range: `value` is `[min, max]` or `{min, max}`.
    Between,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::InRange => "in_range",
            ConditionOperator::Between => "between",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract `(min, max)` from a `between` value in either accepted shape.
///
/// Returns `None` for anything that is not exactly two finite numbers.
pub fn range_bounds(value: &serde_json::Value) -> Option<(f64, f64)> {
    let (min, max) = match value {
        serde_json::Value::Array(items) if items.len() == 2 => (items[0].as_f64()?, items[1].as_f64()?),
        serde_json::Value::Object(map) if map.len() == 2 => {
            (map.get("min")?.as_f64()?, map.get("max")?.as_f64()?)
        }
        _ => return None,
    };
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}
