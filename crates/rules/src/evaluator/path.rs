//! Dotted-path lookup into a subject record.

use serde_json::Value;

/// Resolve `path` (e.g. `profile.addresses.0.country`) inside `subject`.
///
/// Object segments are keys, array segments are zero-based indexes.
/// Explicit `null` counts as absent.
pub fn lookup<'a>(subject: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = subject;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_and_arrays() {
        let subject = json!({
            "age": 30,
            "profile": { "tier": "gold", "addresses": [{ "country": "PH" }, { "country": "SG" }] },
            "consent": { "marketing": false },
        });
        assert_eq!(lookup(&subject, "age"), Some(&json!(30)));
        assert_eq!(lookup(&subject, "profile.tier"), Some(&json!("gold")));
        assert_eq!(lookup(&subject, "profile.addresses.1.country"), Some(&json!("SG")));
        assert_eq!(lookup(&subject, "consent.marketing"), Some(&json!(false)));
    }

    #[test]
    fn absent_paths() {
        let subject = json!({ "age": 30, "gone": null, "tags": ["a"] });
        assert_eq!(lookup(&subject, "name"), None);
        assert_eq!(lookup(&subject, "age.years"), None);
        assert_eq!(lookup(&subject, "gone"), None);
        assert_eq!(lookup(&subject, "tags.3"), None);
        assert_eq!(lookup(&subject, "tags.first"), None);
        assert_eq!(lookup(&subject, ""), None);
    }
}
