//! In-memory event bus.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::broadcast;

use testtrust_core::error::AppError;
use testtrust_core::result::AppResult;
use testtrust_core::types::id::TransportSessionId;

use crate::message::types::OutboundMessage;

use super::EventBus;

/// One message as published on the memory bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusDelivery {
    /// Target session, `None` for broadcasts.
    pub target: Option<TransportSessionId>,
    /// The message.
    pub message: OutboundMessage,
}

/// Broadcast-channel backed bus.
///
/// Subscribers observe every delivery. Sessions count as connected until
/// [`MemoryBus::drop_session`] is called.
#[derive(Debug)]
pub struct MemoryBus {
    tx: broadcast::Sender<BusDelivery>,
    available: AtomicBool,
    dropped: DashSet<TransportSessionId>,
}

impl MemoryBus {
    /// Create a bus with the given channel capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self {
            tx,
            available: AtomicBool::new(true),
            dropped: DashSet::new(),
        }
    }

    /// Subscribe to all deliveries.
    pub fn subscribe(&self) -> broadcast::Receiver<BusDelivery> {
        self.tx.subscribe()
    }

    /// Make the bus accept or refuse publishes.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Mark a session as disconnected.
    pub fn drop_session(&self, session: TransportSessionId) {
        self.dropped.insert(session);
    }

    fn ensure_available(&self) -> AppResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::transport_unavailable(
                "Real-time event bus is not available",
            ))
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn broadcast(&self, message: &OutboundMessage) -> AppResult<usize> {
        self.ensure_available()?;
        Ok(self
            .tx
            .send(BusDelivery {
                target: None,
                message: message.clone(),
            })
            .unwrap_or(0))
    }

    async fn send_to(
        &self,
        session: TransportSessionId,
        message: &OutboundMessage,
    ) -> AppResult<bool> {
        self.ensure_available()?;
        if self.dropped.contains(&session) {
            return Ok(false);
        }
        let _ = self.tx.send(BusDelivery {
            target: Some(session),
            message: message.clone(),
        });
        Ok(true)
    }

    fn is_session_connected(&self, session: TransportSessionId) -> bool {
        !self.dropped.contains(&session)
    }
}
