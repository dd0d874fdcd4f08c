//! Built-in periodic tasks.

pub mod expiry;
pub mod presence;

pub use expiry::ExpirySweepTask;
pub use presence::PresenceReconciliationTask;
