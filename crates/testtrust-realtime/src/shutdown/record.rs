//! Shutdown record definition.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use testtrust_core::types::exam::ClientInfo;
use testtrust_core::types::id::{ExamId, InstructorId, StudentId, TransportSessionId};

/// Failure reason written by the expiry sweep.
pub const EXPIRED_REASON: &str = "Power-on window expired";

/// One student's remote shutdown and its recovery window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownRecord {
    /// Student identifier.
    pub student_id: StudentId,
    /// Exam the student was shut down from.
    pub exam_id: ExamId,
    /// When the shutdown was issued.
    pub shutdown_at: DateTime<Utc>,
    /// Length of the recovery window.
    pub recovery_window_seconds: u64,
    /// Set once the window has elapsed.
    pub expired: bool,
    /// Set together with `expired`.
    pub failed: bool,
    /// Why the record failed.
    pub failure_reason: Option<String>,
    /// Instructor who issued the shutdown.
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,
    /// Transport session the student held when shut down.
    #[serde(skip)]
    pub resume_session: Option<TransportSessionId>,
    /// Workstation metadata captured at shutdown.
    #[serde(skip)]
    pub resume_client: Option<ClientInfo>,
}

impl ShutdownRecord {
    /// Instant at which the recovery window closes.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.shutdown_at + Duration::seconds(self.recovery_window_seconds as i64)
    }

    /// `now < shutdown_at + window`. The boundary itself is outside.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Whether a power-on issued at `now` may succeed.
    pub fn can_power_on(&self, now: DateTime<Utc>) -> bool {
        !self.expired && self.is_within_window(now)
    }

    /// Whole seconds left in the window at `now`, never negative.
    pub fn time_remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }

    /// Serializable snapshot with derived fields evaluated at `now`.
    pub fn view(&self, now: DateTime<Utc>) -> ShutdownRecordView {
        ShutdownRecordView {
            can_power_on: self.can_power_on(now),
            time_remaining_seconds: if self.expired {
                0
            } else {
                self.time_remaining_seconds(now)
            },
            expires_at: self.expires_at(),
            record: self.clone(),
        }
    }
}

/// A shutdown record as shown to instructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownRecordView {
    /// The stored record.
    #[serde(flatten)]
    pub record: ShutdownRecord,
    /// When the window closes.
    pub expires_at: DateTime<Utc>,
    /// Whether power-on would currently be accepted.
    pub can_power_on: bool,
    /// Seconds left in the window.
    pub time_remaining_seconds: i64,
}
