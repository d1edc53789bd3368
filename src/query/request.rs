//! # Query Request
//!
//! Parses transport parameters into a [`QueryRequest`]. The parser is
//! forgiving: malformed filters, projections and paging values
//! degrade to their defaults instead of failing the request. The only hard
//! requirement (a non-empty path in read mode) is enforced by the service.

use std::collections::HashMap;

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::projection::Projection;

/// A parsed data request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Logical path (trimmed, not yet normalized)
    pub path: String,
    /// Folder listing instead of file read
    pub browse: bool,
    /// Decoded filter object; `None` when absent or unusable
    pub filters: Option<Value>,
    pub projection: Projection,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Return raw text for files that are not an extractable format
    pub raw: bool,
}

impl QueryRequest {
    /// Request for reading a file
    pub fn read(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Request for listing a folder
    pub fn browse(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            browse: true,
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_projection(mut self, projection: &str) -> Self {
        self.projection = Projection::parse(projection);
        self
    }

    pub fn with_page(mut self, offset: i64, limit: i64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Parse URL query parameters
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str);

        Self {
            path: get("path").unwrap_or("").trim().to_string(),
            browse: get("browse").map(parse_flag).unwrap_or(false),
            filters: get("filters").and_then(parse_filters_text),
            projection: get("projection").map(Projection::parse).unwrap_or_default(),
            offset: get("offset").and_then(parse_int),
            limit: get("limit").and_then(parse_int),
            raw: get("raw").map(parse_flag).unwrap_or(false),
        }
    }

    /// Parse a JSON request body (CLI one-shot queries).
    ///
    /// Accepts the same fields as the URL form. `filters` may be an object or
    /// an encoded string, `projection` a string or an array of names, and
    /// `offset`/`limit` numbers or numeric strings.
    pub fn from_json(value: &Value) -> QueryResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| QueryError::BadRequest("request must be a JSON object".to_string()))?;

        let path = match object.get("path") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(_) => {
                return Err(QueryError::BadRequest("path must be a string".to_string()));
            }
        };

        let filters = match object.get("filters") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => parse_filters_text(text),
            Some(other) => Some(other.clone()),
        };

        let projection = match object.get("projection") {
            Some(Value::String(text)) => Projection::parse(text),
            Some(Value::Array(items)) => {
                Projection::new(items.iter().filter_map(Value::as_str).map(str::trim))
            }
            _ => Projection::all(),
        };

        Ok(Self {
            path,
            browse: json_flag(object.get("browse")),
            filters,
            projection,
            offset: json_int(object.get("offset")),
            limit: json_int(object.get("limit")),
            raw: json_flag(object.get("raw")),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_filters_text(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed filters parameter");
            None
        }
    }
}

fn json_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => parse_flag(s),
        _ => false,
    }
}

fn json_int(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => parse_int(s),
        _ => None,
    }
}
