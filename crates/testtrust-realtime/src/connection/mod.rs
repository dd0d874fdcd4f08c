//! WebSocket connection management: lifecycle, pool, handles, heartbeat.

pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod pool;

pub use handle::{ConnectionHandle, ConnectionRole};
pub use manager::ConnectionManager;
