//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS for the mobile and web clients.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/schedules", post(handlers::create_schedule))
        .route("/schedules/{schedule_id}", delete(handlers::delete_schedule))
        .route("/schedules/{schedule_id}/tasks", post(handlers::assign_tasks));

    let api_v1 = Router::new()
        // Caller-relative queries
        .route("/schedules", get(handlers::list_schedules))
        .route("/schedules/today", get(handlers::today_schedules))
        .route("/schedules/upcoming", get(handlers::upcoming_schedules))
        .route("/schedules/missed", get(handlers::missed_schedules))
        .route("/schedules/completed/today", get(handlers::completed_today))
        .route("/schedules/{schedule_id}", get(handlers::get_schedule))
        // Visit transitions
        .route("/schedules/{schedule_id}/start", post(handlers::start_visit))
        .route("/schedules/{schedule_id}/end", post(handlers::end_visit))
        .route("/schedules/{schedule_id}/cancel-start", post(handlers::cancel_start))
        // Tasks
        .route("/tasks/{task_id}/status", put(handlers::update_task_status))
        .nest("/admin", admin);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
