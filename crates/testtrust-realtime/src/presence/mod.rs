//! Student presence tracking.

pub mod entry;
pub mod registry;

pub use entry::PresenceEntry;
pub use registry::PresenceRegistry;
