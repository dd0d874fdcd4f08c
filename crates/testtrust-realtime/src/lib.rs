//! # testtrust-realtime
//!
//! Live exam session coordination for TestTrust. Provides:
//!
//! - The real-time event bus (WebSocket connections, broadcast, heartbeat)
//! - Student presence tracking with a reconnect grace period
//! - The shutdown ledger and its recovery-window sweep
//! - The session coordinator state machine driving remote shutdown/power-on

pub mod bus;
pub mod connection;
pub mod coordinator;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod shutdown;

pub use bus::{EventBus, MemoryBus};
pub use connection::manager::ConnectionManager;
pub use coordinator::SessionCoordinator;
pub use presence::PresenceRegistry;
pub use server::{EngineStats, RealtimeEngine};
pub use shutdown::ShutdownLedger;
