//! # HTTP Server Module
//!
//! axum front end for the query engine.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/data` - Browse folders and read files (API key required)

pub mod config;
pub mod data_routes;
pub mod errors;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use data_routes::DataState;
pub use errors::ErrorResponse;
pub use server::HttpServer;
