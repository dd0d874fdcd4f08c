//! Connection manager: handles connection lifecycle and message routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use testtrust_core::config::RealtimeConfig;
use testtrust_core::error::AppError;
use testtrust_core::result::AppResult;
use testtrust_core::types::id::TransportSessionId;

use crate::bus::EventBus;
use crate::message::builder;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::heartbeat::{HeartbeatConfig, run_heartbeat};
use super::pool::ConnectionPool;

/// Manages all active WebSocket connections and acts as the production
/// [`EventBus`].
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
    /// Cleared once the manager has been closed.
    accepting: AtomicBool,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(config: RealtimeConfig, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            metrics,
            config,
            accepting: AtomicBool::new(true),
        }
    }

    /// Registers a new connection and starts its heartbeat.
    ///
    /// Returns the handle and the receiver the socket task drains.
    pub fn register(&self) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>)> {
        self.ensure_accepting()?;

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tx));

        self.pool.add(handle.clone());
        self.metrics.connection_opened();

        tokio::spawn(run_heartbeat(
            handle.clone(),
            HeartbeatConfig::from(&self.config),
        ));

        info!(conn_id = %handle.id, "WebSocket connection registered");
        Ok((handle, rx))
    }

    /// Removes a connection from the pool.
    pub fn unregister(&self, conn_id: &TransportSessionId) -> Option<Arc<ConnectionHandle>> {
        let handle = self.pool.remove(conn_id)?;
        handle.close();
        self.metrics.connection_closed();
        info!(conn_id = %conn_id, "WebSocket connection unregistered");
        Some(handle)
    }

    /// Gets a connection handle.
    pub fn get(&self, conn_id: &TransportSessionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Parses a raw frame, replying with an error event when it is malformed.
    pub fn decode(&self, handle: &ConnectionHandle, raw_message: &str) -> Option<InboundMessage> {
        self.metrics.message_received();
        match serde_json::from_str(raw_message) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(conn_id = %handle.id, error = %e, "Rejected inbound frame");
                handle.send(builder::build_error(
                    "INVALID_MESSAGE",
                    &format!("Failed to parse message: {e}"),
                ));
                None
            }
        }
    }

    /// Sends a message to every connected client.
    pub fn broadcast_all(&self, message: &OutboundMessage) -> usize {
        let sent = self
            .pool
            .all_connections()
            .iter()
            .filter(|conn| conn.send(message.clone()))
            .count();
        self.metrics.messages_sent(sent as u64);
        sent
    }

    /// Closes all connections and stops accepting publishes.
    pub fn close_all(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        let all = self.pool.drain();
        for conn in &all {
            conn.close();
            self.metrics.connection_closed();
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Whether new connections and publishes are accepted.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    fn ensure_accepting(&self) -> AppResult<()> {
        if self.is_accepting() {
            Ok(())
        } else {
            Err(AppError::transport_unavailable(
                "Real-time event bus is not initialized",
            ))
        }
    }
}

#[async_trait]
impl EventBus for ConnectionManager {
    async fn broadcast(&self, message: &OutboundMessage) -> AppResult<usize> {
        self.ensure_accepting()?;
        Ok(self.broadcast_all(message))
    }

    async fn send_to(
        &self,
        session: TransportSessionId,
        message: &OutboundMessage,
    ) -> AppResult<bool> {
        self.ensure_accepting()?;
        let sent = self
            .pool
            .get(&session)
            .is_some_and(|conn| conn.send(message.clone()));
        if sent {
            self.metrics.messages_sent(1);
        }
        Ok(sent)
    }

    fn is_session_connected(&self, session: TransportSessionId) -> bool {
        self.pool.is_connected(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testtrust_core::error::ErrorKind;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(RealtimeConfig::default(), Arc::new(RealtimeMetrics::new()))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let manager = manager();
        let (_a, mut rx_a) = manager.register().unwrap();
        let (_b, mut rx_b) = manager.register().unwrap();

        let sent = manager
            .broadcast(&builder::build_error("X", "y"))
            .await
            .unwrap();
        assert_eq!(sent, 2);
        assert_eq!(rx_a.recv().await.unwrap().event_name(), "error");
        assert_eq!(rx_b.recv().await.unwrap().event_name(), "error");
    }

    #[tokio::test]
    async fn test_send_to_targets_one_session() {
        let manager = manager();
        let (a, mut rx_a) = manager.register().unwrap();
        let (_b, mut rx_b) = manager.register().unwrap();

        assert!(manager
            .send_to(a.id, &builder::build_error("X", "y"))
            .await
            .unwrap());
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.try_recv().is_err());

        assert!(!manager
            .send_to(TransportSessionId::new(), &builder::build_error("X", "y"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_reply() {
        let manager = manager();
        let (handle, mut rx) = manager.register().unwrap();

        assert!(manager.decode(&handle, "not json").is_none());
        match rx.recv().await.unwrap() {
            OutboundMessage::Error { code, .. } => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregister_disconnects_session() {
        let manager = manager();
        let (handle, _rx) = manager.register().unwrap();
        assert!(manager.is_session_connected(handle.id));

        manager.unregister(&handle.id);
        assert!(!manager.is_session_connected(handle.id));
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_manager_is_unavailable() {
        let manager = manager();
        let (_handle, _rx) = manager.register().unwrap();
        manager.close_all();

        let err = manager
            .broadcast(&builder::build_error("X", "y"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransportUnavailable);
        assert!(manager.register().is_err());
    }
}
