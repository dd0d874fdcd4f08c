//! Event bus abstraction.
//!
//! Every instructor dashboard and student client hangs off the bus. The
//! WebSocket [`ConnectionManager`](crate::connection::manager::ConnectionManager)
//! is the production implementation; [`MemoryBus`] backs tests and tooling.

pub mod memory;

use async_trait::async_trait;

use testtrust_core::result::AppResult;
use testtrust_core::types::id::TransportSessionId;

use crate::message::types::OutboundMessage;

pub use memory::{BusDelivery, MemoryBus};

/// Publish side of the real-time transport.
///
/// `Err` means the transport itself is unavailable. Having no listeners is
/// not an error: `broadcast` then reports zero deliveries.
#[async_trait]
pub trait EventBus: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver a message to every connected client.
    async fn broadcast(&self, message: &OutboundMessage) -> AppResult<usize>;

    /// Deliver a message to one transport session.
    async fn send_to(
        &self,
        session: TransportSessionId,
        message: &OutboundMessage,
    ) -> AppResult<bool>;

    /// Whether a transport session is still connected.
    fn is_session_connected(&self, session: TransportSessionId) -> bool;
}
