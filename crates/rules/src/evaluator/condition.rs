//! Single-condition evaluation: `field <operator> value` against a subject.

use serde_json::Value;

use crate::schema::{range_bounds, Condition, ConditionOperator};

use super::path::lookup;
use super::TraceReason;

/// Outcome of testing one condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionOutcome {
    pub result: bool,
    /// Degree of satisfaction in `[0, 1]`; `0.0` whenever `result` is false.
    pub confidence: f64,
    /// Why the test failed without a plain comparison, if it did.
    pub reason: Option<TraceReason>,
}

impl ConditionOutcome {
    fn pass(confidence: f64) -> Self {
        Self { result: true, confidence: confidence.clamp(0.0, 1.0), reason: None }
    }

    fn fail() -> Self {
        Self { result: false, confidence: 0.0, reason: None }
    }

    fn fault(reason: TraceReason) -> Self {
        Self { result: false, confidence: 0.0, reason: Some(reason) }
    }

    fn exact(hit: bool) -> Self {
        if hit {
            Self::pass(1.0)
        } else {
            Self::fail()
        }
    }
}

/// Evaluates leaf conditions. Total: never panics, never errors.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn evaluate(condition: &Condition, subject: &Value) -> ConditionOutcome {
        let Some(actual) = lookup(subject, &condition.field) else {
            return ConditionOutcome::fault(TraceReason::MissingField);
        };
        let expected = &condition.value;

        match condition.operator {
            ConditionOperator::Equals => ConditionOutcome::exact(values_equal(actual, expected)),
            ConditionOperator::Contains => match (actual, expected) {
                (Value::String(hay), Value::String(needle)) => {
                    ConditionOutcome::exact(hay.contains(needle.as_str()))
                }
                (Value::Array(items), needle) => {
                    ConditionOutcome::exact(items.iter().any(|item| values_equal(item, needle)))
                }
                _ => ConditionOutcome::fault(TraceReason::TypeMismatch),
            },
            ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
                let Some(bound) = expected.as_f64() else {
                    return ConditionOutcome::fault(TraceReason::MalformedValue);
                };
                let Some(v) = actual.as_f64() else {
                    return ConditionOutcome::fault(TraceReason::TypeMismatch);
                };
                let hit = if condition.operator == ConditionOperator::GreaterThan {
                    v > bound
                } else {
                    v < bound
                };
                ConditionOutcome::exact(hit)
            }
            ConditionOperator::InRange => match expected {
                Value::Array(set) => {
                    ConditionOutcome::exact(set.iter().any(|member| values_equal(actual, member)))
                }
                _ => ConditionOutcome::fault(TraceReason::MalformedValue),
            },
            ConditionOperator::Between => {
                let Some((min, max)) = range_bounds(expected) else {
                    return ConditionOutcome::fault(TraceReason::MalformedValue);
                };
                let Some(v) = actual.as_f64() else {
                    return ConditionOutcome::fault(TraceReason::TypeMismatch);
                };
                if min <= v && v <= max {
                    ConditionOutcome::pass(range_confidence(v, min, max))
                } else {
                    ConditionOutcome::fail()
                }
            }
        }
    }
}

/// Type-aware equality; numbers compare by value so `3` equals `3.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// `1.0` at the midpoint of `[min, max]`, falling linearly to `0.5` at either bound.
pub(crate) fn range_confidence(v: f64, min: f64, max: f64) -> f64 {
    let half = (max - min) / 2.0;
    if half <= 0.0 {
        return 1.0;
    }
    let mid = min + half;
    (0.5 + 0.5 * (1.0 - (v - mid).abs() / half)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(field: &str, op: ConditionOperator, value: Value, subject: Value) -> ConditionOutcome {
        ConditionEvaluator::evaluate(&Condition::new(field, op, value), &subject)
    }

    #[test]
    fn missing_field_fails_closed() {
        let out = eval("age", ConditionOperator::Equals, json!(30), json!({}));
        assert!(!out.result);
        assert_eq!(out.confidence, 0.0);
        assert_eq!(out.reason, Some(TraceReason::MissingField));
    }

    #[test]
    fn equals_is_type_aware() {
        let subject = json!({ "age": 30, "tier": "gold", "vip": true });
        assert!(eval("age", ConditionOperator::Equals, json!(30), subject.clone()).result);
        assert!(eval("age", ConditionOperator::Equals, json!(30.0), subject.clone()).result);
        assert!(!eval("age", ConditionOperator::Equals, json!("30"), subject.clone()).result);
        assert!(eval("tier", ConditionOperator::Equals, json!("gold"), subject.clone()).result);
        assert!(!eval("vip", ConditionOperator::Equals, json!("true"), subject.clone()).result);
        assert_eq!(eval("tier", ConditionOperator::Equals, json!("gold"), subject).confidence, 1.0);
    }

    #[test]
    fn contains_strings_and_collections() {
        let subject = json!({ "email": "ana@example.com", "tags": ["vip", "beta", 7] });
        assert!(eval("email", ConditionOperator::Contains, json!("example"), subject.clone()).result);
        assert!(!eval("email", ConditionOperator::Contains, json!("nope"), subject.clone()).result);
        assert!(eval("tags", ConditionOperator::Contains, json!("beta"), subject.clone()).result);
        assert!(eval("tags", ConditionOperator::Contains, json!(7), subject.clone()).result);
        assert!(!eval("tags", ConditionOperator::Contains, json!("gold"), subject.clone()).result);

        let out = eval("email", ConditionOperator::Contains, json!(5), subject);
        assert_eq!(out.reason, Some(TraceReason::TypeMismatch));
    }

    #[test]
    fn numeric_comparisons() {
        let subject = json!({ "score": 0.7, "name": "ana" });
        assert!(eval("score", ConditionOperator::GreaterThan, json!(0.5), subject.clone()).result);
        assert!(!eval("score", ConditionOperator::GreaterThan, json!(0.7), subject.clone()).result);
        assert!(eval("score", ConditionOperator::LessThan, json!(1), subject.clone()).result);

        let out = eval("name", ConditionOperator::GreaterThan, json!(1), subject.clone());
        assert_eq!(out.reason, Some(TraceReason::TypeMismatch));
        let out = eval("score", ConditionOperator::LessThan, json!("1"), subject);
        assert_eq!(out.reason, Some(TraceReason::MalformedValue));
    }

    #[test]
    fn in_range_is_set_membership() {
        let subject = json!({ "device": "ios", "hour": 9 });
        assert!(eval("device", ConditionOperator::InRange, json!(["ios", "android"]), subject.clone()).result);
        assert!(!eval("device", ConditionOperator::InRange, json!(["web"]), subject.clone()).result);
        assert!(eval("hour", ConditionOperator::InRange, json!([9.0, 10.0]), subject.clone()).result);

        let out = eval("device", ConditionOperator::InRange, json!("ios"), subject);
        assert_eq!(out.reason, Some(TraceReason::MalformedValue));
    }

    #[test]
    fn between_is_inclusive_with_graded_confidence() {
        let at = |age: f64| eval("age", ConditionOperator::Between, json!([25, 35]), json!({ "age": age }));

        assert_eq!(at(30.0).confidence, 1.0);
        assert!(at(25.0).result);
        assert_eq!(at(25.0).confidence, 0.5);
        assert!(at(35.0).result);
        assert_eq!(at(35.0).confidence, 0.5);
        assert!((at(27.5).confidence - 0.75).abs() < 1e-9);
        assert!(!at(40.0).result);
        assert_eq!(at(40.0).confidence, 0.0);
        assert!(!at(24.9).result);
    }

    #[test]
    fn between_confidence_is_monotonic_toward_midpoint() {
        let mut last = 0.0;
        for v in [25.0, 26.0, 28.0, 29.5, 30.0] {
            let c = range_confidence(v, 25.0, 35.0);
            assert!(c >= last, "{} at {}", c, v);
            last = c;
        }
    }

    #[test]
    fn between_accepts_object_form_and_point_range() {
        let subject = json!({ "n": 5 });
        let out = eval("n", ConditionOperator::Between, json!({ "min": 5, "max": 5 }), subject.clone());
        assert!(out.result);
        assert_eq!(out.confidence, 1.0);

        let out = eval("n", ConditionOperator::Between, json!([1]), subject);
        assert_eq!(out.reason, Some(TraceReason::MalformedValue));
    }
}
