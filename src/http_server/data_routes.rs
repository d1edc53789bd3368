//! Data HTTP Routes
//!
//! `GET /data` runs a browse or read query for the caller identified by its
//! API key.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::access::{AccessConfig, Principal};
use crate::query::{QueryError, QueryRequest, QueryResult, QueryService};

// ==================
// Shared State
// ==================

/// Data state shared across handlers
pub struct DataState {
    pub service: QueryService,
    pub access: AccessConfig,
}

impl DataState {
    pub fn new(service: QueryService, access: AccessConfig) -> Self {
        Self { service, access }
    }
}

/// Create data routes
pub fn data_routes(state: Arc<DataState>) -> Router {
    Router::new()
        .route("/data", get(data_handler))
        .with_state(state)
}

// ==================
// Helpers
// ==================

/// Resolve the principal from the `apikey` header or a bearer token
fn extract_principal(access: &AccessConfig, headers: &HeaderMap) -> QueryResult<Principal> {
    let key = headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(QueryError::Unauthenticated)?;

    access
        .principal_for_key(key)
        .map(Principal::named)
        .ok_or(QueryError::Unauthenticated)
}

// ==================
// Handlers
// ==================

async fn data_handler(
    State(state): State<Arc<DataState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, QueryError> {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("data_request", request_id = %request_id);

    let principal = span.in_scope(|| extract_principal(&state.access, &headers))?;
    let request = QueryRequest::from_params(&params);

    // file reads block; keep them off the async workers
    let worker_state = state.clone();
    let response = tokio::task::spawn_blocking(move || {
        span.in_scope(|| worker_state.service.execute(&principal, &request))
    })
    .await
    .map_err(|e| QueryError::Internal(format!("query task failed: {}", e)))??;

    Ok(([("x-request-id", request_id)], Json(response)).into_response())
}
