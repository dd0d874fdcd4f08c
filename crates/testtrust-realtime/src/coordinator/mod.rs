//! Live exam session coordination.
//!
//! The [`SessionCoordinator`] owns every transition of the per-student state
//! machine (`Offline → Online → ShutdownPending → Expired`) and is the only
//! writer of the presence registry and shutdown ledger.

mod audit;
pub mod reconnect;
pub mod session;
pub mod state;


pub use session::{
    BulkResult, BulkStatus, ConnectedCount, ExamClosure, JoinOutcome, RosterEntry,
    SessionCoordinator,
};
pub use state::SessionState;
