//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use testtrust_core::config::AppConfig;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_realtime::RealtimeEngine;
use testtrust_realtime::SessionCoordinator;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// WebSocket realtime engine
    pub realtime: Arc<RealtimeEngine>,
    /// Exam directory
    pub directory: Arc<dyn ExamDirectory>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create the state.
    pub fn new(
        config: Arc<AppConfig>,
        realtime: Arc<RealtimeEngine>,
        directory: Arc<dyn ExamDirectory>,
    ) -> Self {
        Self {
            config,
            realtime,
            directory,
            started_at: Instant::now(),
        }
    }

    /// Shortcut to the session coordinator.
    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.realtime.coordinator
    }
}
