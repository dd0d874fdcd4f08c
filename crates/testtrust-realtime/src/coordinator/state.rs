//! Per-student session state.

use serde::{Deserialize, Serialize};

use crate::presence::entry::PresenceEntry;
use crate::shutdown::record::ShutdownRecord;

/// Where a student stands in the shutdown / power-on cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No presence entry and no shutdown record.
    Offline,
    /// Connected, no shutdown record.
    Online,
    /// Shut down, recovery window still open.
    ShutdownPending,
    /// Recovery window elapsed. Terminal for this shutdown cycle.
    Expired,
}

impl SessionState {
    /// Derive the state from what the registry and ledger hold.
    ///
    /// A shutdown record always wins over presence.
    pub fn derive(presence: Option<&PresenceEntry>, record: Option<&ShutdownRecord>) -> Self {
        match (presence, record) {
            (_, Some(r)) if r.expired => Self::Expired,
            (_, Some(_)) => Self::ShutdownPending,
            (Some(_), None) => Self::Online,
            (None, None) => Self::Offline,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Online => write!(f, "online"),
            Self::ShutdownPending => write!(f, "shutdown_pending"),
            Self::Expired => write!(f, "expired"),
        }
    }
}
