//! # Projection
//!
//! Narrows records to a caller-chosen list of fields.

use super::record::Record;

/// Ordered, de-duplicated field allowlist. Empty means "all fields".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Projection that keeps everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for field in fields {
            let field = field.into();
            if !field.is_empty() && !projection.fields.contains(&field) {
                projection.fields.push(field);
            }
        }
        projection
    }

    /// Parse a comma-separated field list; blank entries are dropped
    pub fn parse(text: &str) -> Self {
        Self::new(text.split(',').map(str::trim))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the requested fields that exist in `record`, in projection order
    pub fn apply(&self, record: Record) -> Record {
        if self.is_all() {
            return record;
        }

        let mut record = record;
        self.fields
            .iter()
            .filter_map(|field| record.remove(field).map(|v| (field.clone(), v)))
            .collect()
    }
}
