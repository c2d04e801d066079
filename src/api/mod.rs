//! API handlers for Staybook REST endpoints

pub mod health;
pub mod openapi;
pub mod visits;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// API v1 routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Visits
        .route("/properties/:property_id/visits", post(visits::record_visit))
        .route(
            "/properties/:property_id/visits/count",
            get(visits::get_visit_count),
        )
        .with_state(state)
}
