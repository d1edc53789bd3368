//! Principal carried with each request

use std::fmt;

use crate::query::{QueryError, QueryResult};

/// The caller a request is evaluated for
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Principal {
    name: Option<String>,
}

impl Principal {
    /// An identified caller
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// A caller with no established identity
    pub fn anonymous() -> Self {
        Self { name: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    /// Get the principal name or fail with `Unauthenticated`
    pub fn require_name(&self) -> QueryResult<&str> {
        self.name().ok_or(QueryError::Unauthenticated)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("<anonymous>"))
    }
}
