//! Shutdown ledger: one record per shut-down student.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use testtrust_core::types::id::{ExamId, InstructorId, StudentId};

use crate::presence::entry::PresenceEntry;

use super::record::{EXPIRED_REASON, ShutdownRecord};

/// Tracks recovery windows independently of any observer.
#[derive(Debug)]
pub struct ShutdownLedger {
    /// Student ID → active or expired record
    records: DashMap<StudentId, ShutdownRecord>,
    /// Recovery window applied to new records
    recovery_window_seconds: u64,
}

impl ShutdownLedger {
    /// Create a ledger whose records carry the given recovery window.
    pub fn new(recovery_window_seconds: u64) -> Self {
        Self {
            records: DashMap::new(),
            recovery_window_seconds,
        }
    }

    /// Recovery window applied to new records.
    pub fn recovery_window_seconds(&self) -> u64 {
        self.recovery_window_seconds
    }

    /// Create a fresh record, replacing any prior one for the student.
    ///
    /// `resume_from` is the presence entry the student held when shut down;
    /// its transport session is used to restore presence on power-on.
    pub fn begin_shutdown(
        &self,
        student_id: &StudentId,
        exam_id: &ExamId,
        shutdown_at: DateTime<Utc>,
        instructor_id: Option<InstructorId>,
        resume_from: Option<&PresenceEntry>,
    ) -> ShutdownRecord {
        let record = ShutdownRecord {
            student_id: student_id.clone(),
            exam_id: exam_id.clone(),
            shutdown_at,
            recovery_window_seconds: self.recovery_window_seconds,
            expired: false,
            failed: false,
            failure_reason: None,
            instructor_id,
            resume_session: resume_from.map(|e| e.transport_session_id),
            resume_client: resume_from.and_then(|e| e.client.clone()),
        };
        self.records.insert(student_id.clone(), record.clone());
        record
    }

    /// True iff a record exists and `now < shutdown_at + window`.
    pub fn is_within_recovery_window(&self, student_id: &StudentId, now: DateTime<Utc>) -> bool {
        self.records
            .get(student_id)
            .is_some_and(|r| r.is_within_window(now))
    }

    /// Get a student's record
    pub fn get(&self, student_id: &StudentId) -> Option<ShutdownRecord> {
        self.records.get(student_id).map(|r| r.value().clone())
    }

    /// Whether any record (active or expired) exists for the student.
    pub fn contains(&self, student_id: &StudentId) -> bool {
        self.records.contains_key(student_id)
    }

    /// Delete a student's record.
    pub fn end_shutdown(&self, student_id: &StudentId) -> Option<ShutdownRecord> {
        self.records.remove(student_id).map(|(_, r)| r)
    }

    /// Flag a single record as expired.
    ///
    /// Returns the record only if this call performed the transition.
    pub fn mark_expired(&self, student_id: &StudentId) -> Option<ShutdownRecord> {
        let mut record = self.records.get_mut(student_id)?;
        if record.expired {
            return None;
        }
        expire(&mut record);
        Some(record.clone())
    }

    /// Flag every record whose window has elapsed at `now`.
    ///
    /// Returns the records newly flagged by this sweep; already expired
    /// records are never reported twice.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<ShutdownRecord> {
        let mut newly_expired = Vec::new();
        for mut record in self.records.iter_mut() {
            if !record.expired && !record.is_within_window(now) {
                expire(&mut record);
                newly_expired.push(record.clone());
            }
        }
        newly_expired.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        newly_expired
    }

    /// All records for an exam, ordered by student id.
    pub fn records_for_exam(&self, exam_id: &ExamId) -> Vec<ShutdownRecord> {
        let mut records: Vec<ShutdownRecord> = self
            .records
            .iter()
            .filter(|r| &r.value().exam_id == exam_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        records
    }

    /// All records, ordered by student id.
    pub fn all_records(&self) -> Vec<ShutdownRecord> {
        let mut records: Vec<ShutdownRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        records
    }

    /// Remove every record for an exam (exam-end cleanup).
    pub fn purge_exam(&self, exam_id: &ExamId) -> Vec<ShutdownRecord> {
        let students: Vec<StudentId> = self
            .records
            .iter()
            .filter(|r| &r.value().exam_id == exam_id)
            .map(|r| r.key().clone())
            .collect();

        students
            .iter()
            .filter_map(|s| {
                self.records
                    .remove_if(s, |_, r| &r.exam_id == exam_id)
                    .map(|(_, r)| r)
            })
            .collect()
    }

    /// Number of records not yet expired.
    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| !r.value().expired).count()
    }

    /// Total number of records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn expire(record: &mut ShutdownRecord) {
    record.expired = true;
    record.failed = true;
    record.failure_reason = Some(EXPIRED_REASON.to_string());
}
