//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

use testtrust_api::{AppState, build_app};
use testtrust_core::config::AppConfig;
use testtrust_core::traits::clock::ManualClock;
use testtrust_core::types::exam::{ExamSummary, StudentProfile};
use testtrust_core::types::id::{ExamId, StudentId, TransportSessionId};
use testtrust_directory::MemoryExamDirectory;
use testtrust_realtime::bus::BusDelivery;
use testtrust_realtime::coordinator::JoinOutcome;
use testtrust_realtime::message::types::OutboundMessage;
use testtrust_realtime::{MemoryBus, RealtimeEngine};

/// Exam seeded into every test app.
pub const EXAM: &str = "exam-E";

/// Students enrolled for [`EXAM`].
pub const ENROLLED: [&str; 4] = ["A", "B", "C", "S"];

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub realtime: Arc<RealtimeEngine>,
    /// Clock driving recovery windows
    pub clock: Arc<ManualClock>,
    /// Bus capturing every published event
    pub bus: Arc<MemoryBus>,
    /// Subscriber on `bus`
    pub events: broadcast::Receiver<BusDelivery>,
    /// Seeded exam directory
    pub directory: Arc<MemoryExamDirectory>,
}

/// Fixed start instant for the manual clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0).unwrap()
}

impl TestApp {
    /// Create a new test application with one seeded exam
    pub fn new() -> Self {
        let config = AppConfig::from_toml("").expect("Failed to load test config");

        let directory = Arc::new(MemoryExamDirectory::new());
        directory.insert_exam(ExamSummary {
            id: ExamId::new(EXAM),
            subject: "Data Structures".to_string(),
            department: "Computer Science".to_string(),
            year: "2".to_string(),
            duration: 90,
            student_count: ENROLLED.len() as u32,
            student_ids: ENROLLED.iter().map(|s| StudentId::new(*s)).collect(),
        });
        for id in ENROLLED {
            directory.insert_student(StudentProfile {
                id: StudentId::new(id),
                name: format!("Student {id}"),
                registration_number: Some(format!("REG-{id}")),
                department: None,
            });
        }

        let clock = Arc::new(ManualClock::new(t0()));
        let bus = Arc::new(MemoryBus::new(1024));
        let events = bus.subscribe();

        let realtime = Arc::new(RealtimeEngine::with_bus(
            config.realtime.clone(),
            config.session.clone(),
            directory.clone(),
            clock.clone(),
            bus.clone(),
        ));

        let state = AppState::new(Arc::new(config), realtime.clone(), directory.clone());
        let router = build_app(state);

        Self {
            router,
            realtime,
            clock,
            bus,
            events,
            directory,
        }
    }

    /// Join a student to the seeded exam on a fresh transport session
    pub async fn join(&self, student: &str) -> TransportSessionId {
        let session = TransportSessionId::new();
        let outcome = self
            .realtime
            .coordinator
            .handle_join(&StudentId::new(student), session, Some(ExamId::new(EXAM)), None)
            .await;
        assert!(
            matches!(outcome, JoinOutcome::Joined(_)),
            "Join refused: {outcome:?}"
        );
        session
    }

    /// Drain every event published so far
    pub fn drain_events(&mut self) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(delivery) = self.events.try_recv() {
            out.push(delivery.message);
        }
        out
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
