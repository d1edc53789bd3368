//! Observable events
//!
//! Events are explicit and typed; their SCREAMING_CASE names are what ends up
//! in the `event` field of every log line.

use std::fmt;

use tracing::Level;

/// Observable events in the data lake service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// HTTP server is starting
    ServerStart,
    /// HTTP server is accepting connections
    ServerReady,
    /// HTTP server stopped
    ServerStop,

    // Query processing
    /// Request accepted for processing
    QueryReceived,
    /// File read finished and a page was produced
    QueryCompleted,
    /// Folder listing produced
    BrowseCompleted,
    /// Request ended with a client error
    QueryRejected,
    /// Request ended with a server-side error
    QueryFailed,

    // Extraction
    /// Unparseable JSON lines were dropped during extraction
    RecordsSkipped,
    /// A folder entry could not be inspected and was left out of a listing
    EntrySkipped,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerStart => "SERVER_START",
            Event::ServerReady => "SERVER_READY",
            Event::ServerStop => "SERVER_STOP",
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::QueryCompleted => "QUERY_COMPLETED",
            Event::BrowseCompleted => "BROWSE_COMPLETED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::RecordsSkipped => "RECORDS_SKIPPED",
            Event::EntrySkipped => "ENTRY_SKIPPED",
        }
    }

    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            Event::QueryFailed => Level::ERROR,
            Event::EntrySkipped => Level::WARN,
            Event::QueryReceived | Event::RecordsSkipped => Level::DEBUG,
            _ => Level::INFO,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
