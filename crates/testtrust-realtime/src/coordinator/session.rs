//! Session coordinator: validates instructor commands and student events
//! and applies them to the registry and ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use testtrust_core::config::SessionConfig;
use testtrust_core::error::AppError;
use testtrust_core::result::AppResult;
use testtrust_core::traits::clock::Clock;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_core::types::exam::{ClientInfo, ExamSummary, StudentProfile};
use testtrust_core::types::id::{ExamId, InstructorId, StudentId, TransportSessionId};

use crate::bus::EventBus;
use crate::message::builder;
use crate::message::types::{DisconnectReason, OutboundMessage, StatusAction};
use crate::metrics::RealtimeMetrics;
use crate::presence::entry::PresenceEntry;
use crate::presence::registry::PresenceRegistry;
use crate::shutdown::ledger::ShutdownLedger;
use crate::shutdown::record::{ShutdownRecord, ShutdownRecordView};

use super::audit;
use super::state::SessionState;

/// Outcome of a `student_join`.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Presence recorded.
    Joined(PresenceEntry),
    /// The student holds a shutdown record; presence was not touched.
    Refused(SessionState),
}

/// Per-student status in a bulk shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkStatus {
    /// The student was shut down.
    Shutdown,
    /// The student had no presence entry.
    NotConnected,
    /// Shutdown failed for another reason.
    Failed,
}

/// One entry of a bulk shutdown result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    /// Student identifier.
    pub student_id: StudentId,
    /// What happened.
    pub status: BulkStatus,
    /// `true` only for [`BulkStatus::Shutdown`].
    pub success: bool,
    /// Failure message for [`BulkStatus::Failed`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Roster line for the instructor dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Student identifier.
    pub student_id: StudentId,
    /// Display name, when the directory knows the student.
    pub name: Option<String>,
    /// Registration number, when known.
    pub registration_number: Option<String>,
    /// Derived session state.
    pub status: SessionState,
    /// Whether a presence entry exists.
    pub online: bool,
    /// Current transport session.
    pub transport_session_id: Option<TransportSessionId>,
    /// Exam the student is joined to.
    pub exam_id: Option<ExamId>,
    /// When the current presence entry was created.
    pub connected_at: Option<DateTime<Utc>>,
    /// Last join or activity.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Workstation metadata.
    pub client: Option<ClientInfo>,
    /// Shutdown record, if any.
    pub shutdown: Option<ShutdownRecordView>,
}

/// Connection counts for one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedCount {
    /// Students enrolled for the exam.
    pub total_students: usize,
    /// Students with a presence entry for the exam.
    pub connected_students: usize,
    /// `total - connected`, never negative.
    pub offline_students: usize,
}

/// Result of closing an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamClosure {
    /// Shutdown records removed.
    pub purged_records: usize,
    /// Presence entries whose exam association was cleared.
    pub cleared_presence: usize,
}

/// Coordinates presence, shutdown, and power-on for every student.
///
/// Mutations run under a single transition lock, so interleaved requests are
/// applied one at a time against the latest state. Exam lookups happen before
/// the lock is taken; everything read from the registry or ledger is read
/// after.
#[derive(Debug)]
pub struct SessionCoordinator {
    pub(super) registry: Arc<PresenceRegistry>,
    pub(super) ledger: Arc<ShutdownLedger>,
    pub(super) bus: Arc<dyn EventBus>,
    pub(super) directory: Arc<dyn ExamDirectory>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: SessionConfig,
    pub(super) metrics: Arc<RealtimeMetrics>,
    pub(super) transition: Mutex<()>,
}

impl SessionCoordinator {
    /// Create a coordinator over the given state and collaborators.
    pub fn new(
        registry: Arc<PresenceRegistry>,
        ledger: Arc<ShutdownLedger>,
        bus: Arc<dyn EventBus>,
        directory: Arc<dyn ExamDirectory>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            registry,
            ledger,
            bus,
            directory,
            clock,
            config,
            metrics,
            transition: Mutex::new(()),
        }
    }

    /// Presence registry.
    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Shutdown ledger.
    pub fn ledger(&self) -> &Arc<ShutdownLedger> {
        &self.ledger
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current time according to the coordinator's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Student events ──────────────────────────────────────────────

    /// Handle `student_join` from `session`.
    pub async fn handle_join(
        &self,
        student_id: &StudentId,
        session: TransportSessionId,
        exam_id: Option<ExamId>,
        client: Option<ClientInfo>,
    ) -> JoinOutcome {
        let _guard = self.transition.lock().await;
        let now = self.clock.now();

        if let Some(state) = self.refuse_if_shut_down(student_id, session, now).await {
            return JoinOutcome::Refused(state);
        }

        let joined = self
            .registry
            .record_join(student_id, session, exam_id, client, now);
        RealtimeMetrics::inc(&self.metrics.student_joins);

        info!(
            student_id = %student_id,
            conn_id = %session,
            exam_id = ?joined.entry.exam_id,
            reconnect = joined.replaced_session.is_some(),
            "Student joined"
        );

        self.broadcast_best_effort(&builder::build_student_connected(&joined.entry, now))
            .await;
        JoinOutcome::Joined(joined.entry)
    }

    /// Handle `student_activity` from `session`.
    ///
    /// Only the session currently holding the student's entry refreshes it.
    /// Returns `false` if nothing was refreshed.
    pub async fn handle_activity(
        &self,
        student_id: &StudentId,
        session: TransportSessionId,
        exam_id: Option<&ExamId>,
    ) -> bool {
        let _guard = self.transition.lock().await;
        let now = self.clock.now();

        if self.refuse_if_shut_down(student_id, session, now).await.is_some() {
            return false;
        }

        let refreshed = self
            .registry
            .record_activity(student_id, session, exam_id, now);
        if !refreshed {
            debug!(
                student_id = %student_id,
                conn_id = %session,
                "Activity ignored: unknown student or stale session"
            );
        }
        refreshed
    }

    /// Handle an explicit `student_disconnect` sent on `session`.
    ///
    /// A leave from a session that no longer holds the entry is ignored.
    pub async fn handle_leave(
        &self,
        student_id: &StudentId,
        session: TransportSessionId,
    ) -> Option<PresenceEntry> {
        let _guard = self.transition.lock().await;
        let Some(removed) = self.registry.record_leave_if_session(student_id, session) else {
            debug!(
                student_id = %student_id,
                conn_id = %session,
                "Leave from a session that no longer holds the student ignored"
            );
            return None;
        };
        let now = self.clock.now();

        info!(student_id = %student_id, conn_id = %removed.transport_session_id, "Student left");
        self.broadcast_best_effort(&builder::build_student_disconnected(
            &removed,
            DisconnectReason::ClientLeave,
            now,
        ))
        .await;
        Some(removed)
    }

    /// Remove the entry for `student_id` if it still carries `session`.
    ///
    /// Runs when a disconnect grace period elapses.
    pub async fn confirm_disconnect(
        &self,
        student_id: &StudentId,
        session: TransportSessionId,
    ) -> Option<PresenceEntry> {
        let _guard = self.transition.lock().await;
        let Some(removed) = self.registry.record_leave_if_session(student_id, session) else {
            debug!(
                student_id = %student_id,
                conn_id = %session,
                "Grace period elapsed after reconnect or shutdown, nothing removed"
            );
            return None;
        };
        let now = self.clock.now();
        RealtimeMetrics::inc(&self.metrics.grace_disconnects);

        info!(student_id = %student_id, conn_id = %session, "Student disconnected");
        self.broadcast_best_effort(&builder::build_student_disconnected(
            &removed,
            DisconnectReason::TransportClose,
            now,
        ))
        .await;
        Some(removed)
    }

    // ── Instructor commands ─────────────────────────────────────────

    /// Shut down one student's workstation.
    pub async fn shutdown_student(
        &self,
        student_id: &StudentId,
        exam_id: &ExamId,
        instructor_id: Option<InstructorId>,
    ) -> AppResult<ShutdownRecord> {
        self.require_exam(exam_id).await?;
        let _guard = self.transition.lock().await;
        self.shutdown_locked(student_id, exam_id, instructor_id).await
    }

    /// Shut down several students independently.
    ///
    /// Only an unknown exam fails the whole batch.
    pub async fn bulk_shutdown(
        &self,
        student_ids: &[StudentId],
        exam_id: &ExamId,
        instructor_id: Option<InstructorId>,
    ) -> AppResult<Vec<BulkResult>> {
        self.require_exam(exam_id).await?;
        let _guard = self.transition.lock().await;

        let mut results = Vec::with_capacity(student_ids.len());
        for student_id in student_ids {
            let result = match self
                .shutdown_locked(student_id, exam_id, instructor_id.clone())
                .await
            {
                Ok(_) => BulkResult {
                    student_id: student_id.clone(),
                    status: BulkStatus::Shutdown,
                    success: true,
                    error: None,
                },
                Err(e) if e.is_not_found() => BulkResult {
                    student_id: student_id.clone(),
                    status: BulkStatus::NotConnected,
                    success: false,
                    error: None,
                },
                Err(e) => BulkResult {
                    student_id: student_id.clone(),
                    status: BulkStatus::Failed,
                    success: false,
                    error: Some(e.message),
                },
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        audit::bulk_shutdown(exam_id, student_ids.len(), succeeded);
        Ok(results)
    }

    /// Restore a shut-down student within the recovery window.
    ///
    /// Returns the seconds left in the window at the moment of power-on.
    pub async fn power_on(&self, student_id: &StudentId, exam_id: &ExamId) -> AppResult<i64> {
        let exam = self.require_exam(exam_id).await?;

        let _guard = self.transition.lock().await;
        let now = self.clock.now();

        let record = self
            .ledger
            .get(student_id)
            .filter(|r| &r.exam_id == exam_id)
            .ok_or_else(|| AppError::not_found("No shutdown record found for this student"))?;

        if record.expired || !self.ledger.is_within_recovery_window(student_id, now) {
            if let Some(expired) = self.ledger.mark_expired(student_id) {
                RealtimeMetrics::inc(&self.metrics.expirations);
                self.announce_expiry(&expired, now).await;
            }
            RealtimeMetrics::inc(&self.metrics.power_on_rejections);
            audit::power_on_rejected(student_id, exam_id);
            return Err(AppError::invalid_state("Power-on window has expired"));
        }

        let remaining = record.time_remaining_seconds(now);
        self.bus
            .broadcast(&builder::build_power_on_restart(exam, student_id, remaining, now))
            .await?;

        self.ledger.end_shutdown(student_id);

        if let Some(session) = record
            .resume_session
            .filter(|s| self.bus.is_session_connected(*s))
        {
            let joined = self.registry.record_join(
                student_id,
                session,
                Some(exam_id.clone()),
                record.resume_client.clone(),
                now,
            );
            self.broadcast_best_effort(&builder::build_student_connected(&joined.entry, now))
                .await;
        }

        self.broadcast_best_effort(&builder::build_status_update(
            exam_id,
            student_id,
            SessionState::derive(self.registry.get(student_id).as_ref(), None),
            StatusAction::PowerOn,
            now,
        ))
        .await;

        RealtimeMetrics::inc(&self.metrics.power_ons);
        audit::power_on(student_id, exam_id, remaining);
        Ok(remaining)
    }

    /// Broadcast a fresh `start_exam` for an exam.
    pub async fn start_exam(&self, exam_id: &ExamId) -> AppResult<usize> {
        let exam = self.require_exam(exam_id).await?;
        let now = self.clock.now();
        let delivered = self
            .bus
            .broadcast(&builder::build_fresh_start(exam, now))
            .await?;
        audit::exam_started(exam_id, delivered);
        Ok(delivered)
    }

    /// Close an exam: notify clients, then drop its shutdown records and
    /// presence associations.
    pub async fn end_exam(&self, exam_id: &ExamId) -> AppResult<ExamClosure> {
        self.require_exam(exam_id).await?;
        let _guard = self.transition.lock().await;
        let now = self.clock.now();

        self.bus
            .broadcast(&builder::build_exam_closed(exam_id, now))
            .await?;

        let closure = ExamClosure {
            purged_records: self.ledger.purge_exam(exam_id).len(),
            cleared_presence: self.registry.clear_exam(exam_id),
        };
        audit::exam_closed(exam_id, closure.purged_records, closure.cleared_presence);
        Ok(closure)
    }

    // ── Periodic tasks ──────────────────────────────────────────────

    /// Flag every record whose window has elapsed and announce each one.
    ///
    /// Broadcast failures are logged; the records stay expired.
    pub async fn sweep_expired(&self) -> Vec<ShutdownRecord> {
        let _guard = self.transition.lock().await;
        let now = self.clock.now();

        let expired = self.ledger.sweep_expired(now);
        for record in &expired {
            RealtimeMetrics::inc(&self.metrics.expirations);
            warn!(
                student_id = %record.student_id,
                exam_id = %record.exam_id,
                "Recovery window expired"
            );
            self.announce_expiry(record, now).await;
        }
        expired
    }

    /// Remove presence entries that have not been refreshed recently.
    pub async fn reconcile_stale(&self) -> Vec<PresenceEntry> {
        let _guard = self.transition.lock().await;
        let now = self.clock.now();
        let cutoff = now - Duration::seconds(self.config.stale_after_seconds as i64);

        let mut removed = Vec::new();
        for stale in self.registry.stale_since(cutoff) {
            let Some(entry) = self
                .registry
                .remove_if_unchanged(&stale.student_id, stale.last_seen_at)
            else {
                continue;
            };
            info!(
                student_id = %entry.student_id,
                last_seen_at = %entry.last_seen_at,
                "Removing stale presence entry"
            );
            self.broadcast_best_effort(&builder::build_student_disconnected(
                &entry,
                DisconnectReason::ActivityTimeout,
                now,
            ))
            .await;
            removed.push(entry);
        }
        removed
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Derived state of one student.
    pub fn state_of(&self, student_id: &StudentId) -> SessionState {
        SessionState::derive(
            self.registry.get(student_id).as_ref(),
            self.ledger.get(student_id).as_ref(),
        )
    }

    /// Shutdown record of one student with derived fields.
    pub fn shutdown_record(&self, student_id: &StudentId) -> AppResult<ShutdownRecordView> {
        self.ledger
            .get(student_id)
            .map(|r| r.view(self.clock.now()))
            .ok_or_else(|| AppError::not_found("No shutdown record found for this student"))
    }

    /// Every retained shutdown record of an exam, expired ones included.
    pub async fn shutdown_records(&self, exam_id: &ExamId) -> AppResult<Vec<ShutdownRecordView>> {
        self.require_exam(exam_id).await?;
        let now = self.clock.now();
        Ok(self
            .ledger
            .records_for_exam(exam_id)
            .iter()
            .map(|r| r.view(now))
            .collect())
    }

    /// Enrolled, connected, and offline counts for an exam.
    pub async fn connected_count(&self, exam_id: &ExamId) -> AppResult<ConnectedCount> {
        let exam = self.require_exam(exam_id).await?;
        let total_students = if exam.student_count > 0 {
            exam.student_count as usize
        } else {
            exam.student_ids.len()
        };
        let connected_students = self.registry.list_online(Some(exam_id)).len();

        Ok(ConnectedCount {
            total_students,
            connected_students,
            offline_students: total_students.saturating_sub(connected_students),
        })
    }

    /// Online/offline roster.
    ///
    /// With an exam: every enrolled student plus anyone online for or shut
    /// down from that exam. Without: everyone online or holding a record.
    pub async fn roster(&self, exam_id: Option<&ExamId>) -> AppResult<Vec<RosterEntry>> {
        let profiles: Vec<StudentProfile> = match exam_id {
            Some(exam_id) => {
                self.require_exam(exam_id).await?;
                self.directory.list_exam_students(exam_id).await?
            }
            None => Vec::new(),
        };

        let now = self.clock.now();
        let mut roster: BTreeMap<StudentId, RosterEntry> = BTreeMap::new();

        for profile in profiles {
            roster.insert(
                profile.id.clone(),
                RosterEntry {
                    student_id: profile.id,
                    name: Some(profile.name),
                    registration_number: profile.registration_number,
                    status: SessionState::Offline,
                    online: false,
                    transport_session_id: None,
                    exam_id: exam_id.cloned(),
                    connected_at: None,
                    last_seen_at: None,
                    client: None,
                    shutdown: None,
                },
            );
        }

        for entry in self.registry.list_online(exam_id) {
            let line = roster
                .entry(entry.student_id.clone())
                .or_insert_with(|| blank_roster_entry(&entry.student_id));
            line.online = true;
            line.transport_session_id = Some(entry.transport_session_id);
            line.exam_id = entry.exam_id.clone();
            line.connected_at = Some(entry.connected_at);
            line.last_seen_at = Some(entry.last_seen_at);
            line.client = entry.client.clone();
        }

        let records = match exam_id {
            Some(exam_id) => self.ledger.records_for_exam(exam_id),
            None => self.ledger.all_records(),
        };
        for record in records {
            let line = roster
                .entry(record.student_id.clone())
                .or_insert_with(|| blank_roster_entry(&record.student_id));
            line.exam_id = Some(record.exam_id.clone());
            line.client = line.client.take().or_else(|| record.resume_client.clone());
            line.shutdown = Some(record.view(now));
        }

        Ok(roster
            .into_values()
            .map(|mut line| {
                line.status = self.state_of(&line.student_id);
                line
            })
            .collect())
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn require_exam(&self, exam_id: &ExamId) -> AppResult<ExamSummary> {
        self.directory
            .get_exam_by_id(exam_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exam not found"))
    }

    /// Shutdown transition. Caller holds the transition lock.
    async fn shutdown_locked(
        &self,
        student_id: &StudentId,
        exam_id: &ExamId,
        instructor_id: Option<InstructorId>,
    ) -> AppResult<ShutdownRecord> {
        let now = self.clock.now();

        let entry = self
            .registry
            .get(student_id)
            .ok_or_else(|| AppError::not_found("Student is not currently connected"))?;
        if entry.exam_id.as_ref().is_some_and(|joined| joined != exam_id) {
            return Err(AppError::invalid_state(format!(
                "Student is taking a different exam ({})",
                entry.exam_id.as_ref().map(ExamId::as_str).unwrap_or_default()
            )));
        }

        self.bus
            .broadcast(&builder::build_shutdown_exam_end(exam_id, student_id, now))
            .await?;

        self.registry.record_leave(student_id);
        let record =
            self.ledger
                .begin_shutdown(student_id, exam_id, now, instructor_id, Some(&entry));

        self.broadcast_best_effort(&builder::build_status_update(
            exam_id,
            student_id,
            SessionState::ShutdownPending,
            StatusAction::Shutdown,
            now,
        ))
        .await;

        RealtimeMetrics::inc(&self.metrics.shutdowns);
        audit::shutdown_issued(&record);
        Ok(record)
    }

    /// Re-send the terminal event to a shut-down student's session.
    ///
    /// Returns the student's state when the event was refused.
    async fn refuse_if_shut_down(
        &self,
        student_id: &StudentId,
        session: TransportSessionId,
        now: DateTime<Utc>,
    ) -> Option<SessionState> {
        let record = self.ledger.get(student_id)?;
        let state = SessionState::derive(None, Some(&record));
        let reply = if record.expired {
            builder::build_exam_failed(&record, now)
        } else {
            builder::build_shutdown_exam_end(&record.exam_id, student_id, now)
        };

        RealtimeMetrics::inc(&self.metrics.joins_refused);
        info!(
            student_id = %student_id,
            conn_id = %session,
            state = %state,
            "Refusing student while shut down"
        );
        if let Err(e) = self.bus.send_to(session, &reply).await {
            warn!(conn_id = %session, error = %e, "Failed to notify refused student");
        }
        Some(state)
    }

    async fn announce_expiry(&self, record: &ShutdownRecord, now: DateTime<Utc>) {
        self.broadcast_best_effort(&builder::build_exam_failed(record, now))
            .await;
        self.broadcast_best_effort(&builder::build_status_update(
            &record.exam_id,
            &record.student_id,
            SessionState::Expired,
            StatusAction::Expired,
            now,
        ))
        .await;
    }

    async fn broadcast_best_effort(&self, message: &OutboundMessage) {
        if let Err(e) = self.bus.broadcast(message).await {
            warn!(event = message.event_name(), error = %e, "Broadcast failed");
        }
    }
}

fn blank_roster_entry(student_id: &StudentId) -> RosterEntry {
    RosterEntry {
        student_id: student_id.clone(),
        name: None,
        registration_number: None,
        status: SessionState::Offline,
        online: false,
        transport_session_id: None,
        exam_id: None,
        connected_at: None,
        last_seen_at: None,
        client: None,
        shutdown: None,
    }
}
