//! Server ping loop for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use testtrust_core::config::RealtimeConfig;

use crate::message::builder;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is closed
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Run the heartbeat loop for a connection.
///
/// Any inbound frame counts as a sign of life. A connection silent for longer
/// than the timeout is closed, which surfaces as a transport disconnect.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let silent_for = (Utc::now() - handle.last_activity().await)
            .to_std()
            .unwrap_or_default();
        if silent_for > config.ping_timeout {
            tracing::warn!(
                conn_id = %handle.id,
                silent_secs = silent_for.as_secs(),
                "Heartbeat timeout, closing connection"
            );
            handle.close();
            break;
        }

        if !handle.send(builder::build_ping(Utc::now())) {
            tracing::debug!(conn_id = %handle.id, "Ping send failed");
            if !handle.is_alive() {
                handle.close();
                break;
            }
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
