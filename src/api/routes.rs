//! API route definitions
//!
//! - /api/v1/health, /api/v1/config - service status and effective settings
//! - /api/v1/surveys - survey registration and lookup
//! - /api/v1/comparisons - comparison sessions
//! - /api/v1/comparisons/:id/adjustment - offset history commands

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Create all v1 API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/config", get(handlers::get_config))
        // Surveys
        .route("/surveys", get(handlers::list_surveys).post(handlers::create_survey))
        .route("/surveys/:id", get(handlers::get_survey))
        // Comparisons
        .route(
            "/comparisons",
            get(handlers::list_comparisons).post(handlers::create_comparison),
        )
        .route("/comparisons/:id", get(handlers::get_comparison))
        // Adjustment history
        .route(
            "/comparisons/:id/adjustment",
            get(handlers::get_adjustment).post(handlers::apply_offset),
        )
        .route("/comparisons/:id/adjustment/history", get(handlers::get_adjustment_history))
        .route("/comparisons/:id/adjustment/undo", post(handlers::undo))
        .route("/comparisons/:id/adjustment/redo", post(handlers::redo))
        .route("/comparisons/:id/adjustment/reset", post(handlers::reset))
        .route("/comparisons/:id/adjustment/recalculate", post(handlers::recalculate))
        .with_state(state)
}
