//! API route handlers
//!
//! Thin adapters from HTTP to [`ComparisonService`]. Service calls touch the
//! store and may resample thousands of stations, so they run on the blocking
//! pool rather than on the async executor.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::{self, defaults};
use crate::error::CompareError;
use crate::service::ComparisonService;
use crate::types::{OffsetRequest, Survey};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ComparisonService>,
}

impl ApiState {
    pub fn new(service: ComparisonService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateComparisonRequest {
    pub primary_survey_id: String,
    pub reference_survey_id: String,
    #[serde(default)]
    pub resolution: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Optimistic concurrency guard for history commands.
#[derive(Debug, Deserialize)]
pub struct CursorQuery {
    #[serde(default)]
    pub expected_cursor: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_backend: &'static str,
    pub default_resolution: u32,
}

// ============================================================================
// Internal helpers
// ============================================================================

/// Run a service command on the blocking pool and wrap the result.
async fn run<T, F>(state: &ApiState, command: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&ComparisonService) -> Result<T, CompareError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    match tokio::task::spawn_blocking(move || command(&service)).await {
        Ok(Ok(data)) => ApiResponse::ok(data),
        Ok(Err(e)) => ApiErrorResponse::from_error(&e),
        Err(e) => {
            error!(error = %e, "Service task failed");
            ApiErrorResponse::internal(format!("command did not complete: {e}"))
        }
    }
}

fn cursor(query: Result<Query<CursorQuery>, QueryRejection>) -> Result<Option<u64>, Response> {
    query
        .map(|Query(q)| q.expected_cursor)
        .map_err(|e| ApiErrorResponse::bad_request(e.body_text()))
}

// ============================================================================
// Service
// ============================================================================

/// GET /api/v1/health
pub async fn get_health(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_backend: state.service.backend_name(),
        default_resolution: state.service.default_resolution(),
    })
}

/// GET /api/v1/config
pub async fn get_config() -> Response {
    ApiResponse::ok(config::get().clone())
}

// ============================================================================
// Surveys
// ============================================================================

/// POST /api/v1/surveys
pub async fn create_survey(
    State(state): State<ApiState>,
    body: Result<Json<Survey>, JsonRejection>,
) -> Response {
    let Json(survey) = match body {
        Ok(body) => body,
        Err(e) => return ApiErrorResponse::bad_request(e.body_text()),
    };

    let service = Arc::clone(&state.service);
    match tokio::task::spawn_blocking(move || service.register_survey(survey)).await {
        Ok(Ok(summary)) => ApiResponse::created(summary),
        Ok(Err(e)) => ApiErrorResponse::from_error(&e),
        Err(e) => ApiErrorResponse::internal(format!("command did not complete: {e}")),
    }
}

/// GET /api/v1/surveys
pub async fn list_surveys(State(state): State<ApiState>) -> Response {
    run(&state, |svc| svc.list_surveys()).await
}

/// GET /api/v1/surveys/:id
pub async fn get_survey(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    run(&state, move |svc| svc.get_survey(&id)).await
}

// ============================================================================
// Comparisons
// ============================================================================

/// POST /api/v1/comparisons
pub async fn create_comparison(
    State(state): State<ApiState>,
    body: Result<Json<CreateComparisonRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(e) => return ApiErrorResponse::bad_request(e.body_text()),
    };

    let service = Arc::clone(&state.service);
    let created = tokio::task::spawn_blocking(move || {
        service.create_comparison(&req.primary_survey_id, &req.reference_survey_id, req.resolution)
    })
    .await;

    match created {
        Ok(Ok(session)) => ApiResponse::created(session),
        Ok(Err(e)) => ApiErrorResponse::from_error(&e),
        Err(e) => ApiErrorResponse::internal(format!("command did not complete: {e}")),
    }
}

/// GET /api/v1/comparisons?limit=50
pub async fn list_comparisons(
    State(state): State<ApiState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(query) => query,
        Err(e) => return ApiErrorResponse::bad_request(e.body_text()),
    };
    let limit = q.limit.unwrap_or(defaults::DEFAULT_LIST_LIMIT).min(defaults::MAX_LIST_LIMIT);
    run(&state, move |svc| svc.list_sessions(limit)).await
}

/// GET /api/v1/comparisons/:id
pub async fn get_comparison(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    run(&state, move |svc| svc.get_session(&id)).await
}

// ============================================================================
// Adjustments
// ============================================================================

/// GET /api/v1/comparisons/:id/adjustment
pub async fn get_adjustment(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    run(&state, move |svc| svc.current_adjustment(&id)).await
}

/// GET /api/v1/comparisons/:id/adjustment/history
pub async fn get_adjustment_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Response {
    run(&state, move |svc| svc.adjustment_history(&id)).await
}

/// POST /api/v1/comparisons/:id/adjustment?expected_cursor=N
pub async fn apply_offset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CursorQuery>, QueryRejection>,
    body: Result<Json<OffsetRequest>, JsonRejection>,
) -> Response {
    let expected = match cursor(query) {
        Ok(expected) => expected,
        Err(resp) => return resp,
    };
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => return ApiErrorResponse::bad_request(e.body_text()),
    };
    run(&state, move |svc| svc.apply_offset(&id, &request, expected)).await
}

/// POST /api/v1/comparisons/:id/adjustment/undo
pub async fn undo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CursorQuery>, QueryRejection>,
) -> Response {
    match cursor(query) {
        Ok(expected) => run(&state, move |svc| svc.undo(&id, expected)).await,
        Err(resp) => resp,
    }
}

/// POST /api/v1/comparisons/:id/adjustment/redo
pub async fn redo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CursorQuery>, QueryRejection>,
) -> Response {
    match cursor(query) {
        Ok(expected) => run(&state, move |svc| svc.redo(&id, expected)).await,
        Err(resp) => resp,
    }
}

/// POST /api/v1/comparisons/:id/adjustment/reset
pub async fn reset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CursorQuery>, QueryRejection>,
) -> Response {
    match cursor(query) {
        Ok(expected) => run(&state, move |svc| svc.reset(&id, expected)).await,
        Err(resp) => resp,
    }
}

/// POST /api/v1/comparisons/:id/adjustment/recalculate
pub async fn recalculate(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    query: Result<Query<CursorQuery>, QueryRejection>,
) -> Response {
    match cursor(query) {
        Ok(expected) => run(&state, move |svc| svc.recalculate(&id, expected)).await,
        Err(resp) => resp,
    }
}
