//! Presence entry definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use testtrust_core::types::exam::ClientInfo;
use testtrust_core::types::id::{ExamId, StudentId, TransportSessionId};

/// One student's live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    /// Student identifier, stable across reconnects.
    pub student_id: StudentId,
    /// Transport session, replaced on every reconnect.
    pub transport_session_id: TransportSessionId,
    /// Exam the student is joined to.
    pub exam_id: Option<ExamId>,
    /// When the student first joined with the current entry.
    pub connected_at: DateTime<Utc>,
    /// Last join or activity ping.
    pub last_seen_at: DateTime<Utc>,
    /// Workstation metadata reported by the client.
    #[serde(default)]
    pub client: Option<ClientInfo>,
}

impl PresenceEntry {
    /// Whether this entry belongs to `exam_id`.
    pub fn is_in_exam(&self, exam_id: &ExamId) -> bool {
        self.exam_id.as_ref() == Some(exam_id)
    }
}
