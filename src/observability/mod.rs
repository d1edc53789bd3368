//! Observability for the data lake service
//!
//! Structured logging through `tracing`:
//! - one log line per event, tagged with a typed [`Event`] name
//! - event fields rendered in deterministic (alphabetical) order
//! - JSON or human-readable output, filtered by `RUST_LOG` or the configured level
//!
//! # Usage
//!
//! ```ignore
//! use datalake::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::RecordsSkipped, &[("path", "a.jsonl"), ("skipped", "2")]);
//!
//! let scope = ObservationScope::new("QUERY");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod scope;

pub use events::Event;
pub use scope::ObservationScope;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

/// Key/value pairs rendered as `k=v` in alphabetical key order
pub(crate) struct FieldList<'a>(pub &'a [(&'a str, &'a str)]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&(&str, &str)> = self.0.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (i, (k, v)) in sorted.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

pub(crate) fn emit(level: Level, event: &str, fields: &FieldList<'_>) {
    match level {
        Level::ERROR => tracing::error!(event, fields = %fields),
        Level::WARN => tracing::warn!(event, fields = %fields),
        Level::INFO => tracing::info!(event, fields = %fields),
        Level::DEBUG => tracing::debug!(event, fields = %fields),
        _ => tracing::trace!(event, fields = %fields),
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    emit(event.level(), event.as_str(), &FieldList(fields));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_list_is_sorted() {
        let fields = [("path", "a.json"), ("elapsed_ms", "3")];
        assert_eq!(FieldList(&fields).to_string(), "elapsed_ms=3 path=a.json");
        assert_eq!(FieldList(&[]).to_string(), "");
    }

    #[test]
    fn test_log_config_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(&LogConfig::default());
        init_logging(&LogConfig {
            level: "debug".to_string(),
            format: LogFormat::Text,
        });
        log_event(Event::ConfigLoaded);
    }
}
