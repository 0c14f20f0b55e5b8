//! Detector normalization
//!
//! The server fills in defaults the user never wrote (`boost`,
//! `adjust_pure_negative`, bookkeeping fields). Both sides of a comparison
//! go through [`normalize_detector`] so those defaults do not show up as
//! drift.

use crate::es::{Error, Result};
use serde_json::{Map, Number, Value};

/// Top-level fields owned by the server
const SERVER_MANAGED_FIELDS: &[&str] = &["last_update_time", "schema_version", "user"];

/// Top-level arrays the server adds empty when unset
const EMPTY_DEFAULT_ARRAYS: &[&str] = &["feature_attributes"];

/// Strip server-injected defaults from a decoded detector, in place.
///
/// Idempotent. Non-object values are left alone apart from number
/// rewriting.
pub fn normalize_detector(detector: &mut Value) {
    if let Value::Object(map) = detector {
        for field in SERVER_MANAGED_FIELDS {
            map.remove(*field);
        }
        for field in EMPTY_DEFAULT_ARRAYS {
            if map
                .get(*field)
                .and_then(|v| v.as_array())
                .is_some_and(|a| a.is_empty())
            {
                map.remove(*field);
            }
        }
    }
    strip_query_defaults(detector);
}

fn strip_query_defaults(value: &mut Value) {
    match value {
        Value::Object(map) => {
            remove_default(map, "adjust_pure_negative", |v| v.as_bool() == Some(true));
            remove_default(map, "boost", |v| v.as_f64() == Some(1.0));
            for child in map.values_mut() {
                strip_query_defaults(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_query_defaults),
        Value::Number(n) => {
            if let Some(int) = integral(n) {
                *n = int;
            }
        }
        _ => {}
    }
}

fn remove_default(map: &mut Map<String, Value>, key: &str, is_default: impl Fn(&Value) -> bool) {
    if map.get(key).is_some_and(is_default) {
        map.remove(key);
    }
}

/// `5.0` -> `5`, so that integer and float spellings compare equal
fn integral(n: &Number) -> Option<Number> {
    if n.is_i64() || n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(Number::from(f as i64))
    } else {
        None
    }
}

/// Re-encode JSON text compactly with sorted keys
pub fn normalize_json_string(json: &str) -> Result<String> {
    let value: Value = serde_json::from_str(json).map_err(Error::InvalidBody)?;
    serde_json::to_string(&value).map_err(Error::InvalidBody)
}

/// Parse and normalize a detector body
pub fn normalized_value(json: &str) -> Result<Value> {
    let mut value: Value = serde_json::from_str(json).map_err(Error::InvalidBody)?;
    normalize_detector(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server_copy() -> Value {
        json!({
            "name": "detector",
            "schema_version": 0,
            "last_update_time": 1604412349934u64,
            "user": {"name": "admin", "roles": ["all_access"]},
            "feature_attributes": [],
            "filter_query": {
                "bool": {
                    "filter": [
                        {"prefix": {"log_group": {"value": "group", "boost": 1.0}}}
                    ],
                    "adjust_pure_negative": true,
                    "boost": 1.0
                }
            },
            "detection_interval": {"period": {"interval": 5.0, "unit": "Minutes"}}
        })
    }

    #[test]
    fn test_strips_server_defaults() {
        let mut detector = server_copy();
        normalize_detector(&mut detector);

        assert_eq!(
            detector,
            json!({
                "name": "detector",
                "filter_query": {
                    "bool": {
                        "filter": [{"prefix": {"log_group": {"value": "group"}}}]
                    }
                },
                "detection_interval": {"period": {"interval": 5, "unit": "Minutes"}}
            })
        );
    }

    #[test]
    fn test_keeps_non_default_values() {
        let mut detector = json!({
            "filter_query": {"bool": {"adjust_pure_negative": false, "boost": 2.5}},
            "feature_attributes": [{"feature_name": "f"}]
        });
        let before = detector.clone();
        normalize_detector(&mut detector);
        assert_eq!(detector, before);
    }

    #[test]
    fn test_idempotent() {
        let mut once = server_copy();
        normalize_detector(&mut once);
        let mut twice = once.clone();
        normalize_detector(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_object_input() {
        let mut value = json!([1.0, "x", null]);
        normalize_detector(&mut value);
        assert_eq!(value, json!([1, "x", null]));
    }

    #[test]
    fn test_normalize_json_string_sorts_and_compacts() {
        let out = normalize_json_string("{ \"b\": 1,\n  \"a\": [ true ] }").unwrap();
        assert_eq!(out, r#"{"a":[true],"b":1}"#);
        assert!(normalize_json_string("{not json").is_err());
    }

    #[test]
    fn test_fractional_floats_untouched() {
        let mut value = json!({"score": 0.5});
        normalize_detector(&mut value);
        assert_eq!(value["score"], json!(0.5));
    }
}
