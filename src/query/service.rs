//! # Query Service
//!
//! Runs one request through the pipeline. The service holds only immutable
//! configuration and the gate, so a single instance is shared by every
//! concurrent request.

use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::config::QueryConfig;
use super::errors::{QueryError, QueryResult};
use super::extractor::{Format, RecordExtractor};
use super::filter::Filter;
use super::paginator::{Page, PageWindow, Paginator};
use super::request::QueryRequest;
use super::resolver::{PathResolver, ResolvedPath};
use super::response::{
    BrowseEntry, BrowseResponse, EntryType, FileInfo, QueryResponse, RawContent, RawResponse,
    ReadResponse,
};
use crate::access::{AccessGate, Principal};
use crate::observability::{log_event_with_fields, Event, ObservationScope};

/// Query orchestrator
pub struct QueryService {
    resolver: PathResolver,
    config: QueryConfig,
    paginator: Paginator,
    extractor: RecordExtractor,
    gate: Arc<dyn AccessGate>,
}

impl QueryService {
    pub fn new(resolver: PathResolver, config: QueryConfig, gate: Arc<dyn AccessGate>) -> Self {
        let paginator = Paginator::new(&config);
        Self {
            resolver,
            config,
            paginator,
            extractor: RecordExtractor::new(),
            gate,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Execute a request for `principal`
    pub fn execute(&self, principal: &Principal, request: &QueryRequest) -> QueryResult<QueryResponse> {
        let principal_name = principal.to_string();
        let mode = if request.browse { "browse" } else { "read" };
        log_event_with_fields(
            Event::QueryReceived,
            &[
                ("mode", mode),
                ("path", request.path.as_str()),
                ("principal", principal_name.as_str()),
            ],
        );

        let result = if request.browse {
            self.browse(principal, &request.path).map(QueryResponse::Browse)
        } else {
            self.read(principal, request)
        };

        if let Err(e) = &result {
            let kind = e.kind();
            let event = if kind.is_client_error() {
                Event::QueryRejected
            } else {
                Event::QueryFailed
            };
            let detail = e.to_string();
            log_event_with_fields(
                event,
                &[
                    ("error", detail.as_str()),
                    ("kind", kind.as_str()),
                    ("mode", mode),
                    ("path", request.path.as_str()),
                    ("principal", principal_name.as_str()),
                ],
            );
        }

        result
    }

    /// List the immediate children of a folder, sorted by name
    pub fn browse(&self, principal: &Principal, path: &str) -> QueryResult<BrowseResponse> {
        let resolved = self.resolver.resolve(path)?;
        let metadata = stat(&resolved)?;
        self.authorize(principal, &resolved)?;

        if !metadata.is_dir() {
            return Err(QueryError::BadRequest(format!(
                "'{}' is a file; use read mode",
                resolved.logical
            )));
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&resolved.absolute)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    skip_entry(&resolved.logical, "<unreadable>", &e.to_string());
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = match self.entry_metadata(&entry.path()) {
                Ok(m) => m,
                Err(reason) => {
                    skip_entry(&resolved.logical, &name, &reason);
                    continue;
                }
            };

            let (entry_type, size) = if metadata.is_dir() {
                (EntryType::Folder, None)
            } else {
                (EntryType::File, Some(metadata.len()))
            };

            items.push(BrowseEntry {
                path: resolved.child(&name),
                name,
                entry_type,
                size,
                modified: modified_rfc3339(&metadata),
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        let current_path = if resolved.is_root() {
            "/".to_string()
        } else {
            resolved.logical.clone()
        };

        let total = items.len().to_string();
        log_event_with_fields(
            Event::BrowseCompleted,
            &[("path", current_path.as_str()), ("total", total.as_str())],
        );

        Ok(BrowseResponse::new(current_path, items))
    }

    /// Read, filter, paginate and project a file
    pub fn read(&self, principal: &Principal, request: &QueryRequest) -> QueryResult<QueryResponse> {
        if request.path.trim().is_empty() {
            return Err(QueryError::BadRequest("missing required parameter 'path'".to_string()));
        }

        let resolved = self.resolver.resolve(&request.path)?;
        let metadata = stat(&resolved)?;
        self.authorize(principal, &resolved)?;

        if metadata.is_dir() {
            return Err(QueryError::BadRequest(format!(
                "'{}' is a folder; use browse mode",
                resolved.logical
            )));
        }

        let file_info = FileInfo {
            path: resolved.logical.clone(),
            size_bytes: metadata.len(),
        };

        let format = match Format::detect(&resolved.absolute) {
            Ok(format) => format,
            Err(QueryError::UnsupportedFormat { .. }) if request.raw => {
                return self
                    .read_raw(&resolved.absolute, file_info)
                    .map(QueryResponse::Raw);
            }
            Err(e) => return Err(e),
        };

        let filter = match &request.filters {
            Some(value) => Filter::from_value(value, self.config.unknown_operators)?,
            None => None,
        };
        let window = self.paginator.window(request.offset, request.limit);

        let scope = ObservationScope::with_fields(
            "EXTRACT",
            &[("format", format.as_str()), ("path", resolved.logical.as_str())],
        );
        let page = match self.extract_page(&resolved.absolute, format, filter.as_ref(), window) {
            Ok(page) => {
                let total = page.total_count.to_string();
                let returned = page.items.len().to_string();
                scope.complete_with_fields(&[
                    ("returned", returned.as_str()),
                    ("total", total.as_str()),
                ]);
                page
            }
            Err(e) => {
                scope.fail(&e.to_string(), e.kind().is_client_error());
                return Err(e);
            }
        };

        let results = page.map_items(|record| request.projection.apply(record));

        let total = results.total_count.to_string();
        log_event_with_fields(
            Event::QueryCompleted,
            &[("path", file_info.path.as_str()), ("total", total.as_str())],
        );

        Ok(QueryResponse::Read(ReadResponse { file_info, results }))
    }

    /// Metadata of a listed entry, with symlinks followed.
    ///
    /// Entries whose target lies outside the root, or cannot be reached at
    /// all, are refused so a listing never reports on files `resolve` would
    /// reject.
    fn entry_metadata(&self, path: &Path) -> Result<Metadata, String> {
        let target = fs::canonicalize(path).map_err(|e| e.to_string())?;
        if !target.starts_with(self.resolver.root()) {
            return Err("target is outside the data root".to_string());
        }
        fs::metadata(&target).map_err(|e| e.to_string())
    }

    fn extract_page(
        &self,
        path: &Path,
        format: Format,
        filter: Option<&Filter>,
        window: PageWindow,
    ) -> QueryResult<Page> {
        let records = self.extractor.extract(path, format)?;
        let matching = records.filter(|item| match (item, filter) {
            (Ok(record), Some(filter)) => filter.matches(record),
            _ => true,
        });
        self.paginator.try_paginate(matching, window)
    }

    fn read_raw(&self, path: &Path, file_info: FileInfo) -> QueryResult<RawResponse> {
        let limit = self.config.max_raw_bytes;
        let mut bytes = Vec::new();
        File::open(path)?.take(limit).read_to_end(&mut bytes)?;

        Ok(RawResponse {
            raw: RawContent {
                content: String::from_utf8_lossy(&bytes).into_owned(),
                truncated: file_info.size_bytes > limit,
            },
            file_info,
        })
    }

    /// Anonymous callers are refused. Superusers pass; anyone else needs a
    /// read grant on the path, its topic or the wildcard.
    fn authorize(&self, principal: &Principal, resolved: &ResolvedPath) -> QueryResult<()> {
        principal.require_name()?;

        if self.gate.is_superuser(principal) {
            return Ok(());
        }

        let candidates = [resolved.logical.as_str(), resolved.topic(), ""];
        if candidates
            .iter()
            .any(|path| self.gate.can_read(principal, path))
        {
            return Ok(());
        }

        Err(QueryError::Forbidden(format!(
            "{} may not read '{}'",
            principal,
            display_path(&resolved.logical)
        )))
    }
}

fn stat(resolved: &ResolvedPath) -> QueryResult<Metadata> {
    fs::metadata(&resolved.absolute).map_err(|e| match e.kind() {
        // a file used as a folder mid-path is just as absent
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            QueryError::NotFound(display_path(&resolved.logical).to_string())
        }
        _ => QueryError::Io(e.to_string()),
    })
}

fn display_path(logical: &str) -> &str {
    if logical.is_empty() {
        "/"
    } else {
        logical
    }
}

fn modified_rfc3339(metadata: &Metadata) -> Option<String> {
    metadata
        .modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).to_rfc3339())
}

fn skip_entry(folder: &str, name: &str, reason: &str) {
    log_event_with_fields(
        Event::EntrySkipped,
        &[
            ("error", reason),
            ("folder", display_path(folder)),
            ("name", name),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Access, MemoryAccessGate};
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("orders")).unwrap();
        fs::write(
            dir.path().join("orders/2024.json"),
            r#"[{"id": 1, "status": "paid", "amount": 30},
                {"id": 2, "status": "open", "amount": 5},
                {"id": 3, "status": "paid", "amount": 12}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("orders/notes.txt"), "hello world").unwrap();
        fs::write(dir.path().join("readme.csv"), "id,name\n1,a\n").unwrap();
        dir
    }

    fn service(dir: &TempDir, gate: MemoryAccessGate) -> QueryService {
        let resolver = PathResolver::new(dir.path()).unwrap();
        QueryService::new(resolver, QueryConfig::default(), Arc::new(gate))
    }

    fn superuser_service(dir: &TempDir) -> QueryService {
        service(dir, MemoryAccessGate::new().with_superuser("root"))
    }

    fn root() -> Principal {
        Principal::named("root")
    }

    fn read_page(response: QueryResponse) -> ReadResponse {
        match response {
            QueryResponse::Read(read) => read,
            other => panic!("expected read response, got {:?}", other),
        }
    }

    #[test]
    fn test_read_with_filter_and_projection() {
        let dir = setup();
        let svc = superuser_service(&dir);

        let request = QueryRequest::read("orders/2024.json")
            .with_filters(json!({"status": "paid", "amount": {"gt": 10}}))
            .with_projection("id");
        let read = read_page(svc.execute(&root(), &request).unwrap());

        assert_eq!(read.file_info.path, "orders/2024.json");
        assert_eq!(read.results.total_count, 2);
        assert_eq!(read.results.items[0], json!({"id": 1}).as_object().unwrap().clone());
        assert_eq!(read.results.items[1]["id"], json!(3));
        assert!(read.results.items[1].get("amount").is_none());
    }

    #[test]
    fn test_read_pagination() {
        let dir = setup();
        let svc = superuser_service(&dir);

        let request = QueryRequest::read("orders/2024.json").with_page(1, 1);
        let read = read_page(svc.execute(&root(), &request).unwrap());

        assert_eq!(read.results.items.len(), 1);
        assert_eq!(read.results.items[0]["id"], json!(2));
        assert_eq!(read.results.total_count, 3);
        assert_eq!(read.results.next_offset, Some(2));
    }

    #[test]
    fn test_read_requires_path() {
        let dir = setup();
        let svc = superuser_service(&dir);
        let result = svc.execute(&root(), &QueryRequest::read("  "));
        assert!(matches!(result, Err(QueryError::BadRequest(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = setup();
        let svc = superuser_service(&dir);
        let result = svc.execute(&root(), &QueryRequest::read("orders/2030.json"));
        assert!(matches!(result, Err(QueryError::NotFound(_))));
    }

    #[test]
    fn test_file_used_as_folder_is_not_found() {
        let dir = setup();
        let svc = superuser_service(&dir);

        for path in ["orders/2024.json/x.json", "readme.csv/sub/a.csv"] {
            let result = svc.execute(&root(), &QueryRequest::read(path));
            assert!(
                matches!(result, Err(QueryError::NotFound(_))),
                "{} gave {:?}",
                path,
                result
            );
        }

        let result = svc.execute(&root(), &QueryRequest::browse("orders/2024.json/sub"));
        assert!(matches!(result, Err(QueryError::NotFound(_))));
    }

    #[test]
    fn test_read_escape_is_invalid_path() {
        let dir = setup();
        let svc = superuser_service(&dir);
        let result = svc.execute(&root(), &QueryRequest::read("../../etc/passwd.json"));
        assert!(matches!(result, Err(QueryError::InvalidPath(_))));
    }

    #[test]
    fn test_read_folder_is_bad_request() {
        let dir = setup();
        let svc = superuser_service(&dir);
        let result = svc.execute(&root(), &QueryRequest::read("orders"));
        assert!(matches!(result, Err(QueryError::BadRequest(_))));
    }

    #[test]
    fn test_unsupported_format_and_raw() {
        let dir = setup();
        let svc = superuser_service(&dir);

        let result = svc.execute(&root(), &QueryRequest::read("orders/notes.txt"));
        assert!(matches!(result, Err(QueryError::UnsupportedFormat { .. })));

        let request = QueryRequest::read("orders/notes.txt").with_raw(true);
        match svc.execute(&root(), &request).unwrap() {
            QueryResponse::Raw(raw) => {
                assert_eq!(raw.raw.content, "hello world");
                assert!(!raw.raw.truncated);
                assert_eq!(raw.file_info.size_bytes, 11);
            }
            other => panic!("expected raw response, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_is_truncated() {
        let dir = setup();
        let resolver = PathResolver::new(dir.path()).unwrap();
        let config = QueryConfig {
            max_raw_bytes: 5,
            ..Default::default()
        };
        let svc = QueryService::new(
            resolver,
            config,
            Arc::new(MemoryAccessGate::new().with_superuser("root")),
        );

        let request = QueryRequest::read("orders/notes.txt").with_raw(true);
        match svc.execute(&root(), &request).unwrap() {
            QueryResponse::Raw(raw) => {
                assert_eq!(raw.raw.content, "hello");
                assert!(raw.raw.truncated);
            }
            other => panic!("expected raw response, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_unknown_operator() {
        let dir = setup();
        let resolver = PathResolver::new(dir.path()).unwrap();
        let config = QueryConfig {
            unknown_operators: crate::query::UnknownOperatorPolicy::Reject,
            ..Default::default()
        };
        let svc = QueryService::new(
            resolver,
            config,
            Arc::new(MemoryAccessGate::new().with_superuser("root")),
        );

        let request =
            QueryRequest::read("orders/2024.json").with_filters(json!({"amount": {"gte": 1}}));
        assert!(matches!(
            svc.execute(&root(), &request),
            Err(QueryError::BadRequest(_))
        ));
    }

    #[test]
    fn test_browse_root() {
        let dir = setup();
        let svc = superuser_service(&dir);

        let listing = match svc.execute(&root(), &QueryRequest::browse("")).unwrap() {
            QueryResponse::Browse(listing) => listing,
            other => panic!("expected browse response, got {:?}", other),
        };

        assert_eq!(listing.current_path, "/");
        assert_eq!(listing.total, 2);
        assert_eq!(listing.items[0].name, "orders");
        assert_eq!(listing.items[0].entry_type, EntryType::Folder);
        assert_eq!(listing.items[0].size, None);
        assert_eq!(listing.items[1].name, "readme.csv");
        assert_eq!(listing.items[1].size, Some(12));
        assert!(listing.items[1].modified.is_some());
    }

    #[test]
    fn test_browse_folder_sorted() {
        let dir = setup();
        let svc = superuser_service(&dir);

        let listing = svc.browse(&root(), "orders").unwrap();
        assert_eq!(listing.current_path, "orders");
        let names: Vec<&str> = listing.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["2024.json", "notes.txt"]);
        assert_eq!(listing.items[0].path, "orders/2024.json");
    }

    #[test]
    fn test_browse_file_is_bad_request() {
        let dir = setup();
        let svc = superuser_service(&dir);
        assert!(matches!(
            svc.browse(&root(), "readme.csv"),
            Err(QueryError::BadRequest(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_browse_skips_dangling_symlink() {
        let dir = setup();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("orders/dangling"))
            .unwrap();
        let svc = superuser_service(&dir);

        let listing = svc.browse(&root(), "orders").unwrap();
        assert_eq!(listing.total, 2);
        assert!(listing.items.iter().all(|e| e.name != "dangling"));
    }

    #[cfg(unix)]
    #[test]
    fn test_browse_skips_links_leaving_root() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.json"), "[1, 2, 3]").unwrap();

        let dir = setup();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("orders/out_dir")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.json"),
            dir.path().join("orders/out_file.json"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("readme.csv"),
            dir.path().join("orders/in_root.csv"),
        )
        .unwrap();
        let svc = superuser_service(&dir);

        let listing = svc.browse(&root(), "orders").unwrap();
        let names: Vec<&str> = listing.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["2024.json", "in_root.csv", "notes.txt"]);
        assert_eq!(listing.items[1].size, Some(12));
    }

    #[test]
    fn test_authorization_fallbacks() {
        let dir = setup();
        let request = QueryRequest::read("orders/2024.json");
        let alice = Principal::named("alice");

        let svc = service(&dir, MemoryAccessGate::new());
        assert!(matches!(
            svc.execute(&alice, &request),
            Err(QueryError::Forbidden(_))
        ));

        let svc = service(
            &dir,
            MemoryAccessGate::new().with_grant("alice", "orders/2024.json", Access::Read),
        );
        assert!(svc.execute(&alice, &request).is_ok());

        let svc = service(
            &dir,
            MemoryAccessGate::new().with_grant("alice", "orders", Access::Read),
        );
        assert!(svc.execute(&alice, &request).is_ok());

        let svc = service(&dir, MemoryAccessGate::new().with_grant("alice", "", Access::Read));
        assert!(svc.execute(&alice, &request).is_ok());
    }

    #[test]
    fn test_anonymous_is_unauthenticated() {
        let dir = setup();
        let svc = service(&dir, MemoryAccessGate::new().with_grant("alice", "", Access::Read));
        assert!(matches!(
            svc.execute(&Principal::anonymous(), &QueryRequest::browse("")),
            Err(QueryError::Unauthenticated)
        ));
    }

    #[test]
    fn test_write_grant_does_not_authorize_read() {
        let dir = setup();
        let svc = service(
            &dir,
            MemoryAccessGate::new().with_grant("alice", "orders", Access::Write),
        );
        assert!(matches!(
            svc.execute(&Principal::named("alice"), &QueryRequest::browse("orders")),
            Err(QueryError::Forbidden(_))
        ));
    }
}
