//! # Query Engine
//!
//! Read-only, permissioned queries over files under a sandbox root.
//!
//! ```text
//! resolve -> exists -> authorize -> extract -> filter -> paginate -> project
//! ```
//!
//! Browse mode stops after `authorize` and lists the folder instead.

pub mod config;
pub mod errors;
pub mod extractor;
pub mod filter;
pub mod paginator;
pub mod projection;
pub mod record;
pub mod request;
pub mod resolver;
pub mod response;
pub mod service;

pub use config::{QueryConfig, UnknownOperatorPolicy};
pub use errors::{ErrorKind, QueryError, QueryResult};
pub use extractor::{Format, RecordExtractor, Records};
pub use filter::{Filter, FilterOperator};
pub use paginator::{Page, PageInfo, PageWindow, Paginator};
pub use projection::Projection;
pub use record::Record;
pub use request::QueryRequest;
pub use resolver::{PathResolver, ResolvedPath};
pub use response::{
    BrowseEntry, BrowseResponse, EntryType, FileInfo, QueryResponse, RawContent, RawResponse,
    ReadResponse,
};
pub use service::QueryService;
