//! # Query Errors
//!
//! Error kinds surfaced by the query engine. Every failure that terminates a
//! request maps to exactly one [`ErrorKind`]; per-record parse failures never
//! reach this type because the extractor skips them.

use std::fmt;

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Stable error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Forbidden,
    UnsupportedFormat,
    ParseError,
    BadRequest,
    Unauthenticated,
    Internal,
}

impl ErrorKind {
    /// Returns the wire representation of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "INVALID_PATH",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidPath => 400,
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::UnsupportedFormat => 415,
            ErrorKind::ParseError => 422,
            ErrorKind::Internal => 500,
        }
    }

    /// Client errors are caller mistakes and are logged below error level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query engine errors
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Logical path escapes the root or is malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Resolved path does not exist
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Access gate denied the principal
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// File extension is not an extractable format
    #[error("Unsupported file format '{extension}' (supported: json, jsonl, csv)")]
    UnsupportedFormat { extension: String },

    /// File content is structurally unreadable
    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: String, reason: String },

    /// Missing or unusable request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No principal could be established for the request
    #[error("Authentication required")]
    Unauthenticated,

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Filesystem failure while reading
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::InvalidPath(_) => ErrorKind::InvalidPath,
            QueryError::NotFound(_) => ErrorKind::NotFound,
            QueryError::Forbidden(_) => ErrorKind::Forbidden,
            QueryError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            QueryError::ParseError { .. } => ErrorKind::ParseError,
            QueryError::BadRequest(_) => ErrorKind::BadRequest,
            QueryError::Unauthenticated => ErrorKind::Unauthenticated,
            QueryError::Io(_) | QueryError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Message safe to return to a caller.
    ///
    /// Server-side failures are reduced to a generic message; the detail is
    /// only logged.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal error while processing the request".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::ParseError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Io(err.to_string())
    }
}
