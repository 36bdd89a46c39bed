//! REST API for the operations dashboard

pub mod handlers;
pub mod service;

pub use service::DashboardService;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<DashboardService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/api/v1/health", get(handlers::health))
        // KPI and operational screens
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/operational", get(handlers::get_operational))
        .route("/api/v1/scope", put(handlers::put_scope))
        .route("/api/v1/role", put(handlers::put_role))
        // Search
        .route("/api/v1/search", put(handlers::put_search))
        .route(
            "/api/v1/search/recent",
            get(handlers::get_recent_searches).delete(handlers::delete_recent_searches),
        )
        // Data updates
        .route("/api/v1/refresh", post(handlers::post_refresh))
        .route("/api/v1/reload", post(handlers::post_reload))
        // Drill-down
        .route(
            "/api/v1/drilldown",
            get(handlers::get_drilldown).delete(handlers::close_drilldown),
        )
        .route("/api/v1/drilldown/open/:kpi_id", post(handlers::open_drilldown))
        .route("/api/v1/drilldown/region/:region_id", post(handlers::select_region))
        .route("/api/v1/drilldown/back", post(handlers::drilldown_back))
        .route("/api/v1/drilldown/tab", put(handlers::put_tab))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
