//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use testtrust_core::types::id::{InstructorId, StudentId, TransportSessionId};

use crate::message::types::OutboundMessage;

/// Who is on the other end of a connection.
///
/// Every connection starts unidentified and is bound on its first
/// `student_join` or `instructor_join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ConnectionRole {
    /// No join received yet.
    Unidentified,
    /// A student exam client.
    Student(StudentId),
    /// An instructor dashboard.
    Instructor(Option<InstructorId>),
}

/// A handle to a single WebSocket connection.
///
/// The connection id doubles as the transport session id recorded in
/// presence entries.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: TransportSessionId,
    /// Sender for outbound messages
    pub sender: mpsc::Sender<OutboundMessage>,
    /// Bound identity
    pub role: RwLock<ConnectionRole>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound frame
    pub last_activity: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    pub alive: AtomicBool,
    /// Cancelled when the server wants the socket closed
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: TransportSessionId::new(),
            sender,
            role: RwLock::new(ConnectionRole::Unidentified),
            connected_at: now,
            last_activity: RwLock::new(now),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue an outbound message for this connection.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and ask the socket task to close.
    pub fn close(&self) {
        self.mark_dead();
        self.closed.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Update last activity timestamp
    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Time of the last inbound frame.
    pub async fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().await
    }

    /// Bind the connection to an identity.
    pub async fn bind(&self, role: ConnectionRole) {
        *self.role.write().await = role;
    }

    /// Current identity.
    pub async fn role(&self) -> ConnectionRole {
        self.role.read().await.clone()
    }

    /// Get a snapshot of connection info
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            role: self.role().await,
            connected_at: self.connected_at,
            last_activity: self.last_activity().await,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: TransportSessionId,
    /// Bound identity
    pub role: ConnectionRole,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last activity
    pub last_activity: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::builder;

    #[tokio::test]
    async fn test_send_after_receiver_drop_marks_dead() {
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);
        assert!(handle.send(builder::build_error("A", "b")));

        drop(rx);
        assert!(!handle.send(builder::build_error("A", "b")));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_killing() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        assert!(handle.send(builder::build_error("A", "b")));
        assert!(!handle.send(builder::build_error("A", "b")));
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_bind_role() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        assert_eq!(handle.role().await, ConnectionRole::Unidentified);

        handle
            .bind(ConnectionRole::Student(StudentId::new("s1")))
            .await;
        assert_eq!(
            handle.info().await.role,
            ConnectionRole::Student(StudentId::new("s1"))
        );
    }
}
