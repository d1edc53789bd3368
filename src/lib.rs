//! Datalake - a permissioned query layer over JSON, JSON-Lines and CSV files
//!
//! Callers name a file or folder beneath a sandbox root by its logical path.
//! Files are extracted into records, filtered, paginated and projected;
//! folders are listed. Every request is checked against an access gate
//! before anything is read.
//!
//! # Modules
//!
//! - `query`: path sandboxing, record extraction, filters, paging and the service
//! - `access`: principals and the permission gate
//! - `http_server`: axum routes for `/data` and `/health`
//! - `cli`: `serve` and one-shot `query` commands
//! - `observability`: tracing setup, events and timed scopes
//! - `config`: the JSON configuration file

pub mod access;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod query;
