//! Typed access to untyped document nodes
//!
//! Absent keys and explicit `null` are treated alike. Shape problems become
//! [`ParseError::Structural`]; failed numeric and date conversions become
//! [`ParseError::Format`] naming the offending key.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{ParseError, Result};

pub(crate) type Object = Map<String, Value>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub(crate) fn as_object<'v>(value: &'v Value, what: &str) -> Result<&'v Object> {
    value
        .as_object()
        .ok_or_else(|| ParseError::structural(format!("{} should be an object", what)))
}

pub(crate) fn as_array<'v>(value: &'v Value, what: &str) -> Result<&'v [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ParseError::structural(format!("{} should be an array", what)))
}

/// Value under `key` unless missing or null
pub(crate) fn present<'v>(obj: &'v Object, key: &str) -> Option<&'v Value> {
    obj.get(key).filter(|v| !v.is_null())
}

pub(crate) fn opt_string(obj: &Object, key: &str) -> Result<Option<String>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::structural(format!("{} should be a string", key))),
    }
}

pub(crate) fn required_string(obj: &Object, key: &str, what: &str) -> Result<String> {
    opt_string(obj, key)?.ok_or_else(|| ParseError::structural(format!("{} is missing mandatory field {}", what, key)))
}

/// Strings and numbers, both rendered as text
pub(crate) fn opt_text(obj: &Object, key: &str) -> Result<Option<String>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ParseError::structural(format!("{} should be a string or number", key))),
    }
}

pub(crate) fn opt_bool(obj: &Object, key: &str) -> Result<Option<bool>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ParseError::structural(format!("{} should be a boolean", key))),
    }
}

/// Integer given as a JSON number or as a numeric string
pub(crate) fn opt_i64(obj: &Object, key: &str) -> Result<Option<i64>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ParseError::format(key, format!("{} is not an integer", n))),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|e| ParseError::format(key, e)),
        Some(_) => Err(ParseError::format(key, "expected a number")),
    }
}

pub(crate) fn required_i64(obj: &Object, key: &str, what: &str) -> Result<i64> {
    opt_i64(obj, key)?.ok_or_else(|| ParseError::structural(format!("{} is missing mandatory field {}", what, key)))
}

pub(crate) fn opt_u64(obj: &Object, key: &str) -> Result<Option<u64>> {
    match opt_i64(obj, key)? {
        None => Ok(None),
        Some(n) => u64::try_from(n).map(Some).map_err(|e| ParseError::format(key, e)),
    }
}

pub(crate) fn required_u64(obj: &Object, key: &str, what: &str) -> Result<u64> {
    opt_u64(obj, key)?.ok_or_else(|| ParseError::structural(format!("{} is missing mandatory field {}", what, key)))
}

/// `YYYY-MM-DD`
pub(crate) fn opt_date(obj: &Object, key: &str) -> Result<Option<NaiveDate>> {
    opt_string(obj, key)?
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| ParseError::format(key, e)))
        .transpose()
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub(crate) fn opt_time(obj: &Object, key: &str) -> Result<Option<DateTime<Utc>>> {
    opt_string(obj, key)?
        .map(|s| {
            NaiveDateTime::parse_from_str(&s, TIME_FORMAT)
                .map(|t| t.and_utc())
                .map_err(|e| ParseError::format(key, e))
        })
        .transpose()
}

/// Array of strings; empty when absent
pub(crate) fn string_list(obj: &Object, key: &str) -> Result<Vec<String>> {
    let Some(value) = present(obj, key) else {
        return Ok(Vec::new());
    };
    as_array(value, key)?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| ParseError::structural(format!("{} should contain only strings", key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_numbers_accept_numeric_strings() {
        let o = obj(json!({"a": 3, "b": "42", "c": "4x", "d": null}));
        assert_eq!(opt_i64(&o, "a").unwrap(), Some(3));
        assert_eq!(opt_i64(&o, "b").unwrap(), Some(42));
        assert_eq!(opt_i64(&o, "d").unwrap(), None);
        match opt_i64(&o, "c") {
            Err(ParseError::Format { field, .. }) => assert_eq!(field, "c"),
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_size_is_a_format_error() {
        let o = obj(json!({"filesize": -1}));
        assert!(matches!(opt_u64(&o, "filesize"), Err(ParseError::Format { .. })));
    }

    #[test]
    fn test_dates_and_times() {
        let o = obj(json!({
            "releaseDate": "2024-03-01",
            "createTime": "2024-03-01T10:20:30Z",
            "bad": "01/03/2024"
        }));
        assert_eq!(
            opt_date(&o, "releaseDate").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            opt_time(&o, "createTime").unwrap().unwrap().to_rfc3339(),
            "2024-03-01T10:20:30+00:00"
        );
        assert!(matches!(opt_date(&o, "bad"), Err(ParseError::Format { field, .. }) if field == "bad"));
    }

    #[test]
    fn test_string_list() {
        let o = obj(json!({"categories": ["Data", "Code"], "bad": [1]}));
        assert_eq!(string_list(&o, "categories").unwrap(), vec!["Data", "Code"]);
        assert!(string_list(&o, "missing").unwrap().is_empty());
        assert!(matches!(string_list(&o, "bad"), Err(ParseError::Structural(_))));
    }
}
