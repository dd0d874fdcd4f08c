//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use testtrust_core::config::{RealtimeConfig, SessionConfig};
use testtrust_core::traits::clock::Clock;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_core::types::id::TransportSessionId;

use crate::bus::EventBus;
use crate::connection::handle::ConnectionRole;
use crate::connection::manager::ConnectionManager;
use crate::coordinator::SessionCoordinator;
use crate::message::builder;
use crate::message::types::InboundMessage;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::registry::PresenceRegistry;
use crate::shutdown::ledger::ShutdownLedger;

/// Central real-time engine.
///
/// Owns the WebSocket connections and routes every inbound event to the
/// [`SessionCoordinator`].
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Session coordinator.
    pub coordinator: Arc<SessionCoordinator>,
    /// Presence registry.
    pub registry: Arc<PresenceRegistry>,
    /// Shutdown ledger.
    pub ledger: Arc<ShutdownLedger>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .field("online", &self.registry.count_online())
            .finish()
    }
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Students with a presence entry.
    pub online_students: usize,
    /// Open WebSocket connections.
    pub websocket_connections: usize,
    /// Shutdown records still inside their window.
    pub active_shutdown_records: usize,
    /// Shutdown records including expired ones.
    pub retained_shutdown_records: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

impl RealtimeEngine {
    /// Creates the engine with the WebSocket connection manager as event bus.
    pub fn new(
        realtime: RealtimeConfig,
        session: SessionConfig,
        directory: Arc<dyn ExamDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(realtime, session, directory, clock, None)
    }

    /// Creates the engine publishing to a caller-supplied bus.
    pub fn with_bus(
        realtime: RealtimeConfig,
        session: SessionConfig,
        directory: Arc<dyn ExamDirectory>,
        clock: Arc<dyn Clock>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self::build(realtime, session, directory, clock, Some(bus))
    }

    fn build(
        realtime: RealtimeConfig,
        session: SessionConfig,
        directory: Arc<dyn ExamDirectory>,
        clock: Arc<dyn Clock>,
        bus: Option<Arc<dyn EventBus>>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(PresenceRegistry::new());
        let ledger = Arc::new(ShutdownLedger::new(session.recovery_window_seconds));
        let connections = Arc::new(ConnectionManager::new(realtime, metrics.clone()));
        let bus = bus.unwrap_or_else(|| connections.clone() as Arc<dyn EventBus>);

        let coordinator = Arc::new(SessionCoordinator::new(
            registry.clone(),
            ledger.clone(),
            bus,
            directory,
            clock,
            session,
            metrics.clone(),
        ));

        info!(
            recovery_window_seconds = ledger.recovery_window_seconds(),
            "Real-time engine initialized"
        );

        Self {
            connections,
            coordinator,
            registry,
            ledger,
            metrics,
        }
    }

    /// Processes one inbound text frame from a connection.
    pub async fn handle_inbound(&self, conn_id: &TransportSessionId, raw_message: &str) {
        let Some(handle) = self.connections.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };
        handle.touch().await;

        let Some(msg) = self.connections.decode(&handle, raw_message) else {
            return;
        };

        match msg {
            InboundMessage::StudentJoin {
                student_id,
                exam_id,
                client,
            } => {
                if student_id.is_blank() {
                    handle.send(builder::build_error("VALIDATION", "studentId is required"));
                    return;
                }
                match handle.role().await {
                    ConnectionRole::Student(bound) if bound != student_id => {
                        warn!(
                            conn_id = %handle.id,
                            bound = %bound,
                            student_id = %student_id,
                            "Join for another student on a bound connection refused"
                        );
                        handle.send(builder::build_error(
                            "ALREADY_BOUND",
                            "Connection is already bound to another student",
                        ));
                        return;
                    }
                    _ => {}
                }
                handle
                    .bind(ConnectionRole::Student(student_id.clone()))
                    .await;
                self.coordinator
                    .handle_join(&student_id, handle.id, exam_id, client)
                    .await;
            }
            InboundMessage::StudentActivity {
                student_id,
                exam_id,
            } => {
                if handle.role().await != ConnectionRole::Student(student_id.clone()) {
                    debug!(
                        conn_id = %handle.id,
                        student_id = %student_id,
                        "Activity for a student not bound to this connection ignored"
                    );
                    return;
                }
                self.coordinator
                    .handle_activity(&student_id, handle.id, exam_id.as_ref())
                    .await;
            }
            InboundMessage::StudentDisconnect { student_id, .. } => {
                self.coordinator.handle_leave(&student_id, handle.id).await;
                if handle.role().await == ConnectionRole::Student(student_id) {
                    handle.bind(ConnectionRole::Unidentified).await;
                }
            }
            InboundMessage::InstructorJoin { instructor_id } => {
                info!(
                    conn_id = %handle.id,
                    instructor_id = ?instructor_id,
                    "Instructor dashboard connected"
                );
                handle.bind(ConnectionRole::Instructor(instructor_id)).await;
            }
            InboundMessage::Pong { .. } => {
                debug!(conn_id = %handle.id, "Pong");
            }
        }
    }

    /// Cleans up after a closed socket.
    ///
    /// A connection bound to a student starts the reconnect grace period.
    pub async fn handle_disconnect(&self, conn_id: &TransportSessionId) {
        let Some(handle) = self.connections.unregister(conn_id) else {
            return;
        };
        if let ConnectionRole::Student(student_id) = handle.role().await {
            self.coordinator
                .handle_transport_disconnect(student_id, handle.id);
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            online_students: self.registry.count_online(),
            websocket_connections: self.connections.connection_count(),
            active_shutdown_records: self.ledger.active_count(),
            retained_shutdown_records: self.ledger.len(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Closes every connection. Publishes fail from here on.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.connections.close_all();
        info!("Real-time engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use testtrust_core::traits::clock::ManualClock;
    use testtrust_core::types::exam::ExamSummary;
    use testtrust_core::types::id::{ExamId, StudentId};
    use testtrust_directory::MemoryExamDirectory;

    use super::*;
    use crate::message::types::OutboundMessage;

    fn engine() -> RealtimeEngine {
        engine_with_clock(Arc::new(ManualClock::new(Utc::now())))
    }

    fn engine_with_clock(clock: Arc<ManualClock>) -> RealtimeEngine {
        let directory = Arc::new(MemoryExamDirectory::new());
        directory.insert_exam(ExamSummary {
            id: ExamId::new("e1"),
            subject: "Compilers".to_string(),
            department: String::new(),
            year: String::new(),
            duration: 60,
            student_count: 1,
            student_ids: Vec::new(),
        });
        RealtimeEngine::new(
            RealtimeConfig::default(),
            SessionConfig::default(),
            directory,
            clock,
        )
    }

    #[tokio::test]
    async fn test_join_binds_connection_and_broadcasts() {
        let engine = engine();
        let (student, mut student_rx) = engine.connections.register().unwrap();
        let (_dashboard, mut dashboard_rx) = engine.connections.register().unwrap();

        engine
            .handle_inbound(
                &student.id,
                r#"{"event":"student_join","data":{"studentId":"s1","examId":"e1"}}"#,
            )
            .await;

        assert_eq!(
            student.role().await,
            ConnectionRole::Student(StudentId::new("s1"))
        );
        let entry = engine.registry.get(&StudentId::new("s1")).unwrap();
        assert_eq!(entry.transport_session_id, student.id);

        for rx in [&mut student_rx, &mut dashboard_rx] {
            match rx.recv().await.unwrap() {
                OutboundMessage::StudentConnected { student_id, .. } => {
                    assert_eq!(student_id, StudentId::new("s1"))
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_blank_student_id_is_rejected() {
        let engine = engine();
        let (conn, mut rx) = engine.connections.register().unwrap();

        engine
            .handle_inbound(
                &conn.id,
                r#"{"event":"student_join","data":{"studentId":"  "}}"#,
            )
            .await;

        assert!(matches!(rx.recv().await.unwrap(), OutboundMessage::Error { .. }));
        assert_eq!(engine.registry.count_online(), 0);
    }

    const JOIN_S1: &str = r#"{"event":"student_join","data":{"studentId":"s1","examId":"e1"}}"#;
    const LEAVE_S1: &str = r#"{"event":"student_disconnect","data":{"studentId":"s1","examId":"e1"}}"#;

    #[tokio::test]
    async fn test_leave_on_replaced_socket_keeps_new_socket_online() {
        let engine = engine();
        let (old, _old_rx) = engine.connections.register().unwrap();
        let (new, _new_rx) = engine.connections.register().unwrap();

        engine.handle_inbound(&old.id, JOIN_S1).await;
        engine.handle_inbound(&new.id, JOIN_S1).await;
        engine.handle_inbound(&old.id, LEAVE_S1).await;

        let entry = engine.registry.get(&StudentId::new("s1")).unwrap();
        assert_eq!(entry.transport_session_id, new.id);
        assert_eq!(old.role().await, ConnectionRole::Unidentified);
    }

    #[tokio::test]
    async fn test_join_for_second_student_on_bound_socket_is_refused() {
        let engine = engine();
        let (conn, mut rx) = engine.connections.register().unwrap();

        engine.handle_inbound(&conn.id, JOIN_S1).await;
        assert!(matches!(
            rx.recv().await.unwrap(),
            OutboundMessage::StudentConnected { .. }
        ));

        engine
            .handle_inbound(
                &conn.id,
                r#"{"event":"student_join","data":{"studentId":"s2","examId":"e1"}}"#,
            )
            .await;

        match rx.recv().await.unwrap() {
            OutboundMessage::Error { code, .. } => assert_eq!(code, "ALREADY_BOUND"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!engine.registry.is_online(&StudentId::new("s2")));
        assert_eq!(
            conn.role().await,
            ConnectionRole::Student(StudentId::new("s1"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinding_after_leave_releases_previous_student() {
        let engine = engine();
        let (conn, _rx) = engine.connections.register().unwrap();

        engine.handle_inbound(&conn.id, JOIN_S1).await;
        engine.handle_inbound(&conn.id, LEAVE_S1).await;
        engine
            .handle_inbound(
                &conn.id,
                r#"{"event":"student_join","data":{"studentId":"s2","examId":"e1"}}"#,
            )
            .await;
        engine.handle_disconnect(&conn.id).await;

        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert!(!engine.registry.is_online(&StudentId::new("s1")));
        assert!(!engine.registry.is_online(&StudentId::new("s2")));
    }

    #[tokio::test]
    async fn test_activity_from_other_socket_is_ignored() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = engine_with_clock(clock.clone());
        let (student, _student_rx) = engine.connections.register().unwrap();
        let (other, _other_rx) = engine.connections.register().unwrap();
        engine.handle_inbound(&student.id, JOIN_S1).await;
        let before = engine.registry.get(&StudentId::new("s1")).unwrap().last_seen_at;
        clock.advance_seconds(30);

        engine
            .handle_inbound(
                &other.id,
                r#"{"event":"student_activity","data":{"studentId":"s1","examId":"e1"}}"#,
            )
            .await;

        let after = engine.registry.get(&StudentId::new("s1")).unwrap().last_seen_at;
        assert_eq!(before, after);
        assert_eq!(other.role().await, ConnectionRole::Unidentified);

        engine
            .handle_inbound(
                &student.id,
                r#"{"event":"student_activity","data":{"studentId":"s1","examId":"e1"}}"#,
            )
            .await;
        let refreshed = engine.registry.get(&StudentId::new("s1")).unwrap().last_seen_at;
        assert_eq!(refreshed, before + chrono::Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_instructor_join_creates_no_presence() {
        let engine = engine();
        let (conn, _rx) = engine.connections.register().unwrap();

        engine
            .handle_inbound(
                &conn.id,
                r#"{"event":"instructor_join","data":{"instructorId":"inst-1"}}"#,
            )
            .await;

        assert!(matches!(conn.role().await, ConnectionRole::Instructor(Some(_))));
        assert_eq!(engine.registry.count_online(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_close_removes_student_after_grace() {
        let engine = engine();
        let (conn, _rx) = engine.connections.register().unwrap();
        engine
            .handle_inbound(
                &conn.id,
                r#"{"event":"student_join","data":{"studentId":"s1","examId":"e1"}}"#,
            )
            .await;

        engine.handle_disconnect(&conn.id).await;
        assert!(engine.registry.is_online(&StudentId::new("s1")));

        tokio::time::sleep(std::time::Duration::from_secs(4)).await;
        assert!(!engine.registry.is_online(&StudentId::new("s1")));
        assert_eq!(engine.stats().metrics.grace_disconnects, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let engine = engine();
        let (conn, _rx) = engine.connections.register().unwrap();
        engine.shutdown().await;

        assert!(!conn.is_alive());
        assert_eq!(engine.stats().websocket_connections, 0);
    }
}
