//! # Response Bodies
//!
//! Transport-agnostic result shapes, serialized in camelCase.

use serde::Serialize;

use super::paginator::Page;

/// Kind of a browse entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Folder,
    File,
}

/// One child of a browsed folder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseEntry {
    pub name: String,
    /// Logical path of the child
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Size in bytes; files only
    pub size: Option<u64>,
    /// Last modification time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Folder listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    pub current_path: String,
    pub items: Vec<BrowseEntry>,
    pub total: usize,
}

impl BrowseResponse {
    pub fn new(current_path: String, items: Vec<BrowseEntry>) -> Self {
        let total = items.len();
        Self {
            current_path,
            items,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub size_bytes: u64,
}

/// Records read from a file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub file_info: FileInfo,
    pub results: Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawContent {
    pub content: String,
    /// Whether the file was longer than the configured raw limit
    pub truncated: bool,
}

/// Raw text of a file that is not an extractable format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub file_info: FileInfo,
    pub raw: RawContent,
}

/// Any successful query outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Browse(BrowseResponse),
    Read(ReadResponse),
    Raw(RawResponse),
}
