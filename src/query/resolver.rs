//! # Path Resolver
//!
//! Maps caller-supplied logical paths onto the filesystem beneath a sandbox
//! root.
//!
//! ## Invariants
//! - A resolved path is always the root itself or a descendant of it,
//!   compared component-wise after symlinks are resolved.
//! - Containment is checked after normalization, never on the raw input.
//! - Existence of the target is not checked here.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{QueryError, QueryResult};

/// A logical path together with its sandboxed filesystem location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized, root-relative, `/`-separated path (empty for the root)
    pub logical: String,
    /// Absolute location under the canonical root
    pub absolute: PathBuf,
}

impl ResolvedPath {
    /// Whether this is the sandbox root itself
    pub fn is_root(&self) -> bool {
        self.logical.is_empty()
    }

    /// First segment of the logical path (the topic namespace)
    pub fn topic(&self) -> &str {
        self.logical.split('/').next().unwrap_or("")
    }

    /// Logical path of a direct child
    pub fn child(&self, name: &str) -> String {
        if self.logical.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.logical, name)
        }
    }
}

/// Sandboxing path resolver
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for an existing root directory.
    ///
    /// The root is canonicalized once so later comparisons are against its
    /// real location.
    pub fn new(root: impl AsRef<Path>) -> QueryResult<Self> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| {
            QueryError::Internal(format!("sandbox root {}: {}", root.display(), e))
        })?;

        if !canonical.is_dir() {
            return Err(QueryError::Internal(format!(
                "sandbox root {} is not a directory",
                canonical.display()
            )));
        }

        Ok(Self { root: canonical })
    }

    /// The canonical sandbox root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize a logical path.
    ///
    /// Accepts both `/` and `\` as separators, drops empty and `.` segments and
    /// applies `..` lexically. Climbing above the root, absolute paths, drive
    /// or scheme prefixes and NUL bytes are rejected.
    pub fn normalize(logical: &str) -> QueryResult<String> {
        if logical.contains('\0') {
            return Err(QueryError::InvalidPath("path contains NUL".to_string()));
        }

        if logical.starts_with('/') || logical.starts_with('\\') {
            return Err(QueryError::InvalidPath(format!(
                "absolute paths are not allowed: {}",
                logical
            )));
        }

        let mut segments: Vec<&str> = Vec::new();
        for (i, segment) in logical.split(['/', '\\']).enumerate() {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(QueryError::InvalidPath(format!(
                            "path escapes the data root: {}",
                            logical
                        )));
                    }
                }
                s if i == 0 && s.ends_with(':') => {
                    return Err(QueryError::InvalidPath(format!(
                        "path prefixes are not allowed: {}",
                        logical
                    )));
                }
                s => segments.push(s),
            }
        }

        Ok(segments.join("/"))
    }

    /// Resolve a logical path to a location inside the root
    pub fn resolve(&self, logical: &str) -> QueryResult<ResolvedPath> {
        let logical = Self::normalize(logical)?;

        let mut candidate = self.root.clone();
        for segment in logical.split('/').filter(|s| !s.is_empty()) {
            candidate.push(segment);
        }

        let absolute = self.contain(&candidate, &logical)?;
        Ok(ResolvedPath { logical, absolute })
    }

    /// Canonicalize the deepest existing ancestor of `candidate` and verify it
    /// is still under the root. Symlinks anywhere on the existing part of the
    /// path are followed before the check.
    fn contain(&self, candidate: &Path, logical: &str) -> QueryResult<PathBuf> {
        let existing = candidate
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or(&self.root);

        let canonical = fs::canonicalize(existing)?;
        if !canonical.starts_with(&self.root) {
            return Err(QueryError::InvalidPath(format!(
                "path escapes the data root: {}",
                logical
            )));
        }

        let remainder = candidate.strip_prefix(existing).map_err(|_| {
            QueryError::Internal(format!("ancestor mismatch for {}", candidate.display()))
        })?;

        Ok(canonical.join(remainder))
    }
}
