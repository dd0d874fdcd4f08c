//! Presence registry: the single source of truth for who is connected.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use testtrust_core::types::exam::ClientInfo;
use testtrust_core::types::id::{ExamId, StudentId, TransportSessionId};

use super::entry::PresenceEntry;

/// Result of recording a join.
#[derive(Debug, Clone)]
pub struct JoinRecord {
    /// The entry as stored after the join.
    pub entry: PresenceEntry,
    /// Transport session that was replaced, when this was a reconnect.
    pub replaced_session: Option<TransportSessionId>,
}

/// Tracks at most one [`PresenceEntry`] per student.
///
/// All operations are total: there are no error returns.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Student ID → live connection metadata
    entries: DashMap<StudentId, PresenceEntry>,
}

impl PresenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert or replace the entry for a student.
    ///
    /// A reconnect overwrites the transport session and `last_seen_at` in
    /// place. When `exam_id` or `client` are absent the previous values are
    /// kept.
    pub fn record_join(
        &self,
        student_id: &StudentId,
        transport_session_id: TransportSessionId,
        exam_id: Option<ExamId>,
        client: Option<ClientInfo>,
        now: DateTime<Utc>,
    ) -> JoinRecord {
        match self.entries.entry(student_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let replaced = entry.transport_session_id;
                entry.transport_session_id = transport_session_id;
                entry.last_seen_at = now;
                if exam_id.is_some() {
                    entry.exam_id = exam_id;
                }
                if client.is_some() {
                    entry.client = client;
                }
                JoinRecord {
                    entry: entry.clone(),
                    replaced_session: Some(replaced),
                }
            }
            Entry::Vacant(vacant) => {
                let entry = PresenceEntry {
                    student_id: student_id.clone(),
                    transport_session_id,
                    exam_id,
                    connected_at: now,
                    last_seen_at: now,
                    client,
                };
                vacant.insert(entry.clone());
                JoinRecord {
                    entry,
                    replaced_session: None,
                }
            }
        }
    }

    /// Refresh `last_seen_at` without touching the transport session.
    ///
    /// Only the session holding the entry may refresh it, and only for the
    /// exam the entry is joined to when `exam_id` is given. Returns `false`
    /// when nothing was refreshed.
    pub fn record_activity(
        &self,
        student_id: &StudentId,
        transport_session_id: TransportSessionId,
        exam_id: Option<&ExamId>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(mut entry) = self.entries.get_mut(student_id) else {
            return false;
        };
        if entry.transport_session_id != transport_session_id {
            return false;
        }
        if exam_id.is_some_and(|e| entry.exam_id.as_ref().is_some_and(|joined| joined != e)) {
            return false;
        }
        entry.last_seen_at = now;
        true
    }

    /// Remove the entry for a student.
    pub fn record_leave(&self, student_id: &StudentId) -> Option<PresenceEntry> {
        self.entries.remove(student_id).map(|(_, entry)| entry)
    }

    /// Remove the entry only if it still carries `transport_session_id`.
    ///
    /// Used when a grace period elapses: if the student reconnected in the
    /// meantime the entry holds a newer session and is left alone.
    pub fn record_leave_if_session(
        &self,
        student_id: &StudentId,
        transport_session_id: TransportSessionId,
    ) -> Option<PresenceEntry> {
        self.entries
            .remove_if(student_id, |_, entry| {
                entry.transport_session_id == transport_session_id
            })
            .map(|(_, entry)| entry)
    }

    /// Remove the entry only if it has not been refreshed since `last_seen_at`.
    pub fn remove_if_unchanged(
        &self,
        student_id: &StudentId,
        last_seen_at: DateTime<Utc>,
    ) -> Option<PresenceEntry> {
        self.entries
            .remove_if(student_id, |_, entry| entry.last_seen_at == last_seen_at)
            .map(|(_, entry)| entry)
    }

    /// Get a student's entry
    pub fn get(&self, student_id: &StudentId) -> Option<PresenceEntry> {
        self.entries.get(student_id).map(|r| r.value().clone())
    }

    /// Check if a student is online
    pub fn is_online(&self, student_id: &StudentId) -> bool {
        self.entries.contains_key(student_id)
    }

    /// All entries, optionally restricted to one exam, ordered by student id.
    pub fn list_online(&self, exam_id: Option<&ExamId>) -> Vec<PresenceEntry> {
        let mut online: Vec<PresenceEntry> = self
            .entries
            .iter()
            .filter(|r| exam_id.is_none_or(|exam| r.value().is_in_exam(exam)))
            .map(|r| r.value().clone())
            .collect();
        online.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        online
    }

    /// Online student count
    pub fn count_online(&self) -> usize {
        self.entries.len()
    }

    /// Entries whose last activity is older than `cutoff`.
    pub fn stale_since(&self, cutoff: DateTime<Utc>) -> Vec<PresenceEntry> {
        self.entries
            .iter()
            .filter(|r| r.value().last_seen_at < cutoff)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Drop the exam association of every entry joined to `exam_id`.
    pub fn clear_exam(&self, exam_id: &ExamId) -> usize {
        let mut cleared = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.is_in_exam(exam_id) {
                entry.exam_id = None;
                cleared += 1;
            }
        }
        cleared
    }
}
