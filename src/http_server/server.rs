//! # HTTP Server
//!
//! Combines the data and health routers behind the shared middleware stack.

use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::HttpServerConfig;
use super::data_routes::{data_routes, DataState};
use super::observability_routes::health_routes;
use crate::observability::{log_event_with_fields, Event};
use crate::query::QueryError;

/// HTTP server for the data lake
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn with_config(config: HttpServerConfig, state: Arc<DataState>) -> Self {
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, state: Arc<DataState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin)
        };

        Router::new()
            .merge(health_routes())
            .merge(data_routes(state))
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{}", e)))?;
        let addr_text = addr.to_string();

        log_event_with_fields(Event::ServerStart, &[("addr", addr_text.as_str())]);
        let listener = TcpListener::bind(addr).await?;
        log_event_with_fields(Event::ServerReady, &[("addr", addr_text.as_str())]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        log_event_with_fields(Event::ServerStop, &[("addr", addr_text.as_str())]);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    QueryError::Internal("handler panicked".to_string()).into_response()
}
