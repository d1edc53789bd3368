//! # Record Model
//!
//! A record is an insertion-ordered map from field name to a JSON value
//! (scalar, array or nested object). Records are produced fresh for every
//! query and never persisted.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// One extracted row
pub type Record = Map<String, Value>;

/// Field used when a non-object JSON value has to become a record
pub const SCALAR_FIELD: &str = "value";

/// Turn any JSON value into a record.
///
/// Objects are taken as-is; everything else is wrapped under [`SCALAR_FIELD`].
pub fn from_value(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => {
            let mut record = Record::new();
            record.insert(SCALAR_FIELD.to_string(), other);
            record
        }
    }
}

/// String form of a value for comparisons.
///
/// Strings are used verbatim. Numbers, booleans and null use their JSON text,
/// and arrays and objects use compact JSON.
pub fn coerce_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed("null"),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Floating-point form of a value, if it has one.
///
/// Numbers convert directly, booleans become 1.0 or 0.0, and strings must
/// parse as `f64` after trimming.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
