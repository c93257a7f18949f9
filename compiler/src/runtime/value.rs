//! Bound Value Helpers
//!
//! How update data is read and rendered: sub-value lookup by
//! path tail, string rendering for text and attributes, and the
//! presence tests the directives use.
//!

use serde_json::Value;

// ------------------------------------------------------------- Public Functions

/// Follows `tail` through nested objects. Any missing step
/// yields `null`.
///
pub fn lookup(value: &Value, tail: &[String]) -> Value {
    let mut current = value;
    for segment in tail {
        match current.get(segment.as_str()) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Strings verbatim, `null` as empty, everything else as compact
/// JSON.
///
pub fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness for `if`: `null`, `false`, `0` and `""` are absent.
///
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Non-emptiness for `when`: truthy, and not an empty array or
/// object.
///
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        other => is_truthy(other),
    }
}

/// The sequence a `for` iterates. `null` is empty; any other
/// non-array value has no sequence.
///
pub fn as_sequence(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items.as_slice()),
        Value::Null => Some(Default::default()),
        _ => None,
    }
}

// ------------------------------------------------------------- Unit Tests
