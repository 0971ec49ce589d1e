//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        // Single-phase actions
        .route("/actions", post(handlers::submit_action))
        // Two-phase intents
        .route("/intents", post(handlers::submit_intent))
        .route("/intents/{id}", get(handlers::get_intent))
        .route("/intents/{id}/finalize", post(handlers::finalize_intent))
        // Ledger queries
        .route("/nullifiers/{nullifier}", get(handlers::get_nullifier))
        .route("/commitments/{commitment}", get(handlers::get_commitment))
        .route("/events", get(handlers::list_events))
        // Administration
        .route(
            "/admin/verification-mode",
            post(handlers::set_verification_mode),
        )
        .route("/admin/active-version", post(handlers::set_active_version))
        .layer(TraceLayer::new_for_http())
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
