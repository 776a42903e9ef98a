//! API route definitions

use axum::{routing::get, Router};

use super::handlers;
use super::AppState;

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health_check))

        // Enriched listings
        .route("/api/listings", get(handlers::get_listings))
        .route("/api/sessions/:session/listings", get(handlers::get_session_listings))

        // Single token metadata
        .route("/api/metadata/:contract/:token_id", get(handlers::get_token_metadata))

        // Cache
        .route("/api/cache/stats", get(handlers::get_cache_stats))

        // Add state to all routes
        .with_state(state)
}
