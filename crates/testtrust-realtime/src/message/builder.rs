//! Builder helpers for constructing outbound events.

use chrono::{DateTime, Utc};

use testtrust_core::types::exam::ExamSummary;
use testtrust_core::types::id::{ExamId, StudentId};

use crate::coordinator::state::SessionState;
use crate::presence::entry::PresenceEntry;
use crate::shutdown::record::ShutdownRecord;

use super::types::{
    DisconnectReason, ExamEndAction, ExamPayload, OutboundMessage, StartAction, StatusAction,
};

/// Reason text carried by shutdown `exam_end` events.
pub const SHUTDOWN_REASON: &str = "Workstation shut down by instructor";

/// Reason text carried by exam-wide `exam_end` events.
pub const EXAM_CLOSED_REASON: &str = "Exam closed by instructor";

/// Grade carried by every `exam_failed` event.
pub const FAILING_GRADE: &str = "F";

/// Build a `student_connected` event from a presence entry.
pub fn build_student_connected(entry: &PresenceEntry, timestamp: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::StudentConnected {
        student_id: entry.student_id.clone(),
        transport_session_id: entry.transport_session_id,
        exam_id: entry.exam_id.clone(),
        timestamp,
    }
}

/// Build a `student_disconnected` event from the removed presence entry.
pub fn build_student_disconnected(
    entry: &PresenceEntry,
    reason: DisconnectReason,
    timestamp: DateTime<Utc>,
) -> OutboundMessage {
    OutboundMessage::StudentDisconnected {
        student_id: entry.student_id.clone(),
        transport_session_id: entry.transport_session_id,
        exam_id: entry.exam_id.clone(),
        timestamp,
        reason,
    }
}

/// Build the `exam_end` event sent when a student is shut down.
pub fn build_shutdown_exam_end(
    exam_id: &ExamId,
    student_id: &StudentId,
    timestamp: DateTime<Utc>,
) -> OutboundMessage {
    OutboundMessage::ExamEnd {
        exam_id: exam_id.clone(),
        student_id: Some(student_id.clone()),
        timestamp,
        reason: SHUTDOWN_REASON.to_string(),
        action: ExamEndAction::Shutdown,
    }
}

/// Build the exam-wide `exam_end` event sent when an exam is closed.
pub fn build_exam_closed(exam_id: &ExamId, timestamp: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::ExamEnd {
        exam_id: exam_id.clone(),
        student_id: None,
        timestamp,
        reason: EXAM_CLOSED_REASON.to_string(),
        action: ExamEndAction::ExamClosed,
    }
}

/// Build the `exam_failed` event for an expired shutdown record.
pub fn build_exam_failed(record: &ShutdownRecord, timestamp: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::ExamFailed {
        student_id: record.student_id.clone(),
        exam_id: record.exam_id.clone(),
        timestamp,
        reason: record
            .failure_reason
            .clone()
            .unwrap_or_else(|| crate::shutdown::record::EXPIRED_REASON.to_string()),
        grade: FAILING_GRADE.to_string(),
    }
}

/// Build a `start_exam` for a fresh start of the whole exam.
pub fn build_fresh_start(exam: ExamSummary, timestamp: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::StartExam(ExamPayload {
        action: StartAction::Start,
        exam,
        student_id: None,
        time_remaining_seconds: None,
        timestamp,
    })
}

/// Build a `start_exam` restart for a powered-on student.
pub fn build_power_on_restart(
    exam: ExamSummary,
    student_id: &StudentId,
    time_remaining_seconds: i64,
    timestamp: DateTime<Utc>,
) -> OutboundMessage {
    OutboundMessage::StartExam(ExamPayload {
        action: StartAction::PowerOnRestart,
        exam,
        student_id: Some(student_id.clone()),
        time_remaining_seconds: Some(time_remaining_seconds),
        timestamp,
    })
}

/// Build a dashboard `student_status_update`.
pub fn build_status_update(
    exam_id: &ExamId,
    student_id: &StudentId,
    status: SessionState,
    action: StatusAction,
    timestamp: DateTime<Utc>,
) -> OutboundMessage {
    OutboundMessage::StudentStatusUpdate {
        exam_id: exam_id.clone(),
        student_id: student_id.clone(),
        status,
        action,
        timestamp,
    }
}

/// Build an error reply.
pub fn build_error(code: &str, message: &str) -> OutboundMessage {
    OutboundMessage::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Build a server ping.
pub fn build_ping(now: DateTime<Utc>) -> OutboundMessage {
    OutboundMessage::Ping {
        timestamp: now.timestamp_millis(),
    }
}
