//! Reconnect grace period.
//!
//! A dropped transport does not remove presence immediately: the student
//! client usually reconnects within a few seconds. Removal is scheduled and
//! only happens if the entry still carries the dropped session when the
//! grace period ends.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use testtrust_core::types::id::{StudentId, TransportSessionId};

use super::session::SessionCoordinator;

impl SessionCoordinator {
    /// Schedule presence removal after the configured grace period.
    pub fn handle_transport_disconnect(
        self: &Arc<Self>,
        student_id: StudentId,
        session: TransportSessionId,
    ) -> JoinHandle<()> {
        let grace = self.config.disconnect_grace();
        debug!(
            student_id = %student_id,
            conn_id = %session,
            grace_secs = grace.as_secs(),
            "Transport closed, scheduling disconnect"
        );

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            coordinator.confirm_disconnect(&student_id, session).await;
        })
    }
}
