//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with elapsed time on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::time::Instant;

use super::{emit, FieldList};
use tracing::Level;

/// A scope that automatically logs start and completion of a stage
///
/// ```ignore
/// let scope = ObservationScope::with_fields("QUERY", &[("path", "orders/2024.json")]);
/// // ... do work ...
/// scope.complete_with_fields(&[("total", "42")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: bool,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let scope = Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        };
        scope.log(Level::DEBUG, "BEGIN", &[]);
        scope
    }

    /// Milliseconds since the scope opened
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.completed = true;
        let elapsed = self.elapsed_ms().to_string();
        let mut fields: Vec<(&str, &str)> = extra.to_vec();
        fields.push(("elapsed_ms", elapsed.as_str()));
        self.log(Level::INFO, "COMPLETE", &fields);
    }

    /// Mark the stage as failed. Client-caused failures are logged at WARN.
    pub fn fail(mut self, reason: &str, client_error: bool) {
        self.completed = true;
        let level = if client_error { Level::WARN } else { Level::ERROR };
        self.log(level, "FAILED", &[("reason", reason)]);
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn log(&self, level: Level, suffix: &str, extra: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        emit(level, &event, &FieldList(&fields));
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.log(
                Level::WARN,
                "INCOMPLETE",
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
