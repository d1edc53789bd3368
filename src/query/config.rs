//! Query Engine Configuration
//!
//! Page-size bounds and filter strictness. Passed explicitly into the
//! resolver, paginator and service; nothing here is global.

use serde::{Deserialize, Serialize};

/// How the filter parser treats operators it does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOperatorPolicy {
    /// Drop the operator; the field must still be present
    #[default]
    Ignore,
    /// Fail the request with `BadRequest`
    Reject,
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size when the request gives none (default: 10)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound for any requested page size (default: 100)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Unknown filter operator handling (default: ignore)
    #[serde(default)]
    pub unknown_operators: UnknownOperatorPolicy,

    /// Maximum bytes returned by a raw read (default: 1 MiB)
    #[serde(default = "default_max_raw_bytes")]
    pub max_raw_bytes: u64,
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

fn default_max_raw_bytes() -> u64 {
    1024 * 1024
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            unknown_operators: UnknownOperatorPolicy::default(),
            max_raw_bytes: default_max_raw_bytes(),
        }
    }
}

impl QueryConfig {
    /// Check internal consistency, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit == 0 {
            return Err("query.default_limit must be >= 1".to_string());
        }
        if self.max_limit < self.default_limit {
            return Err(format!(
                "query.max_limit ({}) must be >= query.default_limit ({})",
                self.max_limit, self.default_limit
            ));
        }
        if self.max_raw_bytes == 0 {
            return Err("query.max_raw_bytes must be > 0".to_string());
        }
        Ok(())
    }
}
