//! Mock server route definitions

use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};

use super::handlers;
use super::state::MockState;
use super::ws;

/// Create the mock server router with all routes
pub fn create_router(state: MockState) -> Router {
    let jwt = state.jwt.clone();

    Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health_check))
        // Auth routes
        .route("/api/auth/login", post(handlers::login))
        // Protected routes
        .nest("/api", protected_routes())
        // Real-time endpoint; authentication happens in-band over the
        // socket, not at upgrade time
        .route("/ws", get(ws::mock_ws))
        .layer(Extension(jwt))
        .with_state(state)
}

/// Routes that require a bearer token
fn protected_routes() -> Router<MockState> {
    Router::new()
        // Dashboard
        .route("/dashboard/metrics", get(handlers::dashboard_metrics))
        .route("/dashboard/activity", get(handlers::dashboard_activity))
        .route("/dashboard/charts", get(handlers::dashboard_charts))
        // Assets
        .route("/assets", get(handlers::list_assets))
        .route("/assets", post(handlers::create_asset))
        .route("/assets/:id", get(handlers::get_asset))
        .route("/assets/:id", put(handlers::update_asset))
        .route("/assets/:id", delete(handlers::delete_asset))
        // Audits
        .route("/audits", get(handlers::list_audits))
        .route("/audits", post(handlers::create_audit))
        .route("/audits/:id/complete", post(handlers::complete_audit))
        // Vulnerabilities
        .route("/vulnerabilities", get(handlers::list_vulnerabilities))
        .route("/vulnerabilities", post(handlers::create_vulnerability))
        // Users
        .route("/users", get(handlers::list_users))
        // Reports
        .route("/reports", get(handlers::list_reports))
        .route("/reports/generate", post(handlers::generate_report))
}
