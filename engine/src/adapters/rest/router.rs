//! REST API route table

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Build the full agent API router
pub fn build_router(app: AppState) -> Router {
    Router::new()
        // Agent surfaces
        .route("/status", get(handlers::agent_status))
        .route("/discover", get(handlers::discover))
        .route("/resources", get(handlers::resources))
        .route("/machine/info", get(handlers::machine_info))
        .route("/config", get(handlers::agent_config))
        // Registry
        .route("/services", get(handlers::list_services))
        .route("/services/:id", get(handlers::get_service))
        // Lifecycle
        .route("/services/:id/start", post(handlers::start_service))
        .route("/services/:id/start-auto", post(handlers::start_service_auto))
        .route("/services/:id/stop", post(handlers::stop_service))
        .route("/services/:id/restart", post(handlers::restart_service))
        // Observation
        .route("/services/:id/health", get(handlers::service_health))
        .route("/services/:id/logs", get(handlers::service_logs))
        .route("/services/:id/ports", get(handlers::service_ports))
        .route(
            "/services/:id/refresh-manifest",
            post(handlers::refresh_manifest),
        )
        // Fleet operations
        .route("/scan", post(handlers::scan))
        .route("/ports/conflicts", get(handlers::port_conflicts))
        .route("/ports/assignments", get(handlers::port_assignments))
        .route("/ports/resolve", post(handlers::resolve_port_conflicts))
        .with_state(app)
}
