//! Route definitions for the TestTrust HTTP API.
//!
//! Instructor commands are mounted under `/api`; the WebSocket endpoint and
//! health checks live at the root.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with all routes and the request logging middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(student_routes()).merge(exam_routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes())
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Instructor controls over individual students
fn student_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/students/{student_id}/shutdown",
            post(handlers::students::shutdown_student),
        )
        .route(
            "/students/{student_id}/poweron",
            post(handlers::students::power_on_student),
        )
        .route(
            "/students/{student_id}/shutdown-record",
            get(handlers::students::shutdown_record),
        )
        .route(
            "/students/bulk-shutdown",
            post(handlers::students::bulk_shutdown),
        )
        .route("/students/status", get(handlers::students::student_status))
        .route(
            "/students/shutdown-records/{exam_id}",
            get(handlers::students::shutdown_records),
        )
        .route(
            "/students/connected-count/{exam_id}",
            get(handlers::students::connected_count),
        )
}

/// Exam lifecycle
fn exam_routes() -> Router<AppState> {
    Router::new()
        .route("/exams/{exam_id}/start", post(handlers::exams::start_exam))
        .route("/exams/{exam_id}/end", post(handlers::exams::end_exam))
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
