//! Instructor action audit trail.
//!
//! Emitted on the `audit` tracing target so it can be routed separately.

use testtrust_core::types::id::{ExamId, InstructorId, StudentId};

use crate::shutdown::record::ShutdownRecord;

pub(super) fn shutdown_issued(record: &ShutdownRecord) {
    tracing::info!(
        target: "audit",
        action = "shutdown",
        student_id = %record.student_id,
        exam_id = %record.exam_id,
        instructor_id = record.instructor_id.as_ref().map(InstructorId::as_str).unwrap_or("-"),
        shutdown_at = %record.shutdown_at,
        "Student workstation shut down"
    );
}

pub(super) fn bulk_shutdown(exam_id: &ExamId, requested: usize, succeeded: usize) {
    tracing::info!(
        target: "audit",
        action = "bulk_shutdown",
        exam_id = %exam_id,
        requested,
        succeeded,
        "Bulk shutdown completed"
    );
}

pub(super) fn power_on(student_id: &StudentId, exam_id: &ExamId, remaining_seconds: i64) {
    tracing::info!(
        target: "audit",
        action = "power_on",
        student_id = %student_id,
        exam_id = %exam_id,
        remaining_seconds,
        "Student workstation powered on"
    );
}

pub(super) fn power_on_rejected(student_id: &StudentId, exam_id: &ExamId) {
    tracing::warn!(
        target: "audit",
        action = "power_on",
        student_id = %student_id,
        exam_id = %exam_id,
        "Power-on rejected, window expired"
    );
}

pub(super) fn exam_started(exam_id: &ExamId, delivered: usize) {
    tracing::info!(
        target: "audit",
        action = "exam_start",
        exam_id = %exam_id,
        delivered,
        "Exam started"
    );
}

pub(super) fn exam_closed(exam_id: &ExamId, purged_records: usize, cleared_presence: usize) {
    tracing::info!(
        target: "audit",
        action = "exam_end",
        exam_id = %exam_id,
        purged_records,
        cleared_presence,
        "Exam closed"
    );
}
