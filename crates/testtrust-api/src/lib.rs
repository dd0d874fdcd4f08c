//! # testtrust-api
//!
//! HTTP API layer for TestTrust built on Axum.
//!
//! Provides the instructor control endpoints, the WebSocket upgrade for
//! student clients and dashboards, health checks, middleware (request
//! logging, CORS), DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
