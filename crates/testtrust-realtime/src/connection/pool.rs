//! Connection pool: tracks all active connections by connection id.

use std::sync::Arc;

use dashmap::DashMap;

use testtrust_core::types::id::TransportSessionId;

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    by_id: DashMap<TransportSessionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &TransportSessionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &TransportSessionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Whether a connection is pooled and alive.
    pub fn is_connected(&self, conn_id: &TransportSessionId) -> bool {
        self.by_id
            .get(conn_id)
            .is_some_and(|entry| entry.value().is_alive())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Removes every connection.
    pub fn drain(&self) -> Vec<Arc<ConnectionHandle>> {
        let all = self.all_connections();
        for conn in &all {
            self.by_id.remove(&conn.id);
        }
        all
    }
}
