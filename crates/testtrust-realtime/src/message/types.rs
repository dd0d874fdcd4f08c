//! Inbound and outbound real-time event definitions.
//!
//! Frames are JSON objects of the form `{"event": "<name>", "data": {...}}`
//! with camelCase payload fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use testtrust_core::types::exam::{ClientInfo, ExamSummary};
use testtrust_core::types::id::{ExamId, InstructorId, StudentId, TransportSessionId};

use crate::coordinator::state::SessionState;

/// Events sent by a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum InboundMessage {
    /// A student client announces itself, optionally for an exam.
    StudentJoin {
        /// Student identifier.
        student_id: StudentId,
        /// Exam the student is sitting, if already selected.
        #[serde(default)]
        exam_id: Option<ExamId>,
        /// Workstation metadata.
        #[serde(default)]
        client: Option<ClientInfo>,
    },
    /// Periodic liveness ping from a student client.
    StudentActivity {
        /// Student identifier.
        student_id: StudentId,
        /// Exam in progress.
        #[serde(default)]
        exam_id: Option<ExamId>,
    },
    /// Explicit leave from a student client.
    StudentDisconnect {
        /// Student identifier.
        student_id: StudentId,
        /// Exam being left.
        #[serde(default)]
        exam_id: Option<ExamId>,
    },
    /// An instructor dashboard announces itself.
    InstructorJoin {
        /// Instructor identifier.
        #[serde(default)]
        instructor_id: Option<InstructorId>,
    },
    /// Reply to a server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: i64,
    },
}

/// Events sent by the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    /// A student came online or reconnected.
    StudentConnected {
        /// Student identifier.
        student_id: StudentId,
        /// Current transport session.
        transport_session_id: TransportSessionId,
        /// Exam the student is joined to.
        exam_id: Option<ExamId>,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// A student went offline.
    StudentDisconnected {
        /// Student identifier.
        student_id: StudentId,
        /// Transport session that was removed.
        transport_session_id: TransportSessionId,
        /// Exam the student was joined to.
        exam_id: Option<ExamId>,
        /// Event time.
        timestamp: DateTime<Utc>,
        /// Why the presence entry was removed.
        reason: DisconnectReason,
    },
    /// Navigate to an exam and begin or resume it.
    StartExam(ExamPayload),
    /// Leave the exam. Clients act only when `examId` matches their own exam
    /// and, for shutdowns, when `studentId` is their own.
    ExamEnd {
        /// Exam identifier.
        exam_id: ExamId,
        /// Targeted student; absent when the whole exam is closed.
        student_id: Option<StudentId>,
        /// Event time.
        timestamp: DateTime<Utc>,
        /// Human-readable reason.
        reason: String,
        /// Why the exam ended for the client.
        action: ExamEndAction,
    },
    /// Terminal failure of a shut-down student's attempt.
    ExamFailed {
        /// Student identifier.
        student_id: StudentId,
        /// Exam identifier.
        exam_id: ExamId,
        /// Event time.
        timestamp: DateTime<Utc>,
        /// Human-readable reason.
        reason: String,
        /// Always `"F"`.
        grade: String,
    },
    /// Dashboard refresh signal for one student.
    StudentStatusUpdate {
        /// Exam identifier.
        exam_id: ExamId,
        /// Student identifier.
        student_id: StudentId,
        /// New session state.
        status: SessionState,
        /// What caused the change.
        action: StatusAction,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Server keepalive.
    Ping {
        /// Server timestamp (unix millis).
        timestamp: i64,
    },
    /// Protocol error reply.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// The event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::StudentConnected { .. } => "student_connected",
            Self::StudentDisconnected { .. } => "student_disconnected",
            Self::StartExam(_) => "start_exam",
            Self::ExamEnd { .. } => "exam_end",
            Self::ExamFailed { .. } => "exam_failed",
            Self::StudentStatusUpdate { .. } => "student_status_update",
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }
}

/// Payload of `start_exam`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPayload {
    /// Fresh start or restart after power-on.
    pub action: StartAction,
    /// Exam metadata.
    pub exam: ExamSummary,
    /// Targeted student for restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    /// Seconds left in the recovery window at the moment of power-on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining_seconds: Option<i64>,
    /// Event time.
    pub timestamp: DateTime<Utc>,
}

/// How a student client must treat locally cached answers on `start_exam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartAction {
    /// Fresh start: discard cached answers.
    Start,
    /// Resume after a remote power-on: restore cached answers.
    PowerOnRestart,
}

/// Why `exam_end` was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamEndAction {
    /// The instructor shut the student's workstation down.
    Shutdown,
    /// The instructor closed the exam for everyone.
    ExamClosed,
}

/// Why a presence entry was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The student client sent `student_disconnect`.
    ClientLeave,
    /// The transport closed and no reconnect arrived within the grace period.
    TransportClose,
    /// No activity ping within the staleness threshold.
    ActivityTimeout,
}

/// Cause of a `student_status_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    /// Remote shutdown issued.
    Shutdown,
    /// Remote power-on succeeded.
    PowerOn,
    /// Recovery window elapsed.
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_join_parses_camel_case() {
        let raw = json!({
            "event": "student_join",
            "data": {
                "studentId": "s-1",
                "examId": "e-1",
                "client": { "hostname": "LAB-PC-07", "platform": "win32" }
            }
        });
        let msg: InboundMessage = serde_json::from_value(raw).unwrap();
        match msg {
            InboundMessage::StudentJoin {
                student_id,
                exam_id,
                client,
            } => {
                assert_eq!(student_id, StudentId::new("s-1"));
                assert_eq!(exam_id, Some(ExamId::new("e-1")));
                assert_eq!(client.unwrap().hostname.as_deref(), Some("LAB-PC-07"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_inbound_join_without_exam() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"event":"student_join","data":{"studentId":"s-2"}}"#)
                .unwrap();
        assert!(matches!(
            msg,
            InboundMessage::StudentJoin { exam_id: None, .. }
        ));
    }

    #[test]
    fn test_exam_end_wire_shape() {
        let msg = OutboundMessage::ExamEnd {
            exam_id: ExamId::new("e-1"),
            student_id: Some(StudentId::new("s-1")),
            timestamp: Utc::now(),
            reason: "Remote shutdown by instructor".to_string(),
            action: ExamEndAction::Shutdown,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "exam_end");
        assert_eq!(value["data"]["examId"], "e-1");
        assert_eq!(value["data"]["studentId"], "s-1");
        assert_eq!(value["data"]["action"], "shutdown");
        assert_eq!(msg.event_name(), "exam_end");
    }

    #[test]
    fn test_start_exam_restart_action() {
        let msg = OutboundMessage::StartExam(ExamPayload {
            action: StartAction::PowerOnRestart,
            exam: ExamSummary {
                id: ExamId::new("e-1"),
                subject: "Algorithms".to_string(),
                department: "CS".to_string(),
                year: "2".to_string(),
                duration: 120,
                student_count: 30,
                student_ids: Vec::new(),
            },
            student_id: Some(StudentId::new("s-1")),
            time_remaining_seconds: Some(590),
            timestamp: Utc::now(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "start_exam");
        assert_eq!(value["data"]["action"], "power_on_restart");
        assert_eq!(value["data"]["timeRemainingSeconds"], 590);
        assert_eq!(value["data"]["exam"]["studentCount"], 30);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<InboundMessage, _> =
            serde_json::from_str(r#"{"event":"submit_answers","data":{}}"#);
        assert!(result.is_err());
    }
}
