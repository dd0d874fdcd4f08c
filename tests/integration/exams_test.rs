//! Integration tests for exam start and end.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{EXAM, TestApp};
use testtrust_realtime::message::types::{ExamEndAction, OutboundMessage, StartAction};

#[tokio::test]
async fn test_start_exam_broadcasts_fresh_start() {
    let mut app = TestApp::new();

    let response = app
        .request("POST", &format!("/api/exams/{EXAM}/start"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["success"], true);

    let events = app.drain_events();
    match events.as_slice() {
        [OutboundMessage::StartExam(payload)] => {
            assert_eq!(payload.action, StartAction::Start);
            assert_eq!(payload.exam.id.as_str(), EXAM);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_unknown_exam_is_not_found() {
    let mut app = TestApp::new();

    let response = app.request("POST", "/api/exams/nope/start", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(app.drain_events().is_empty());
}

#[tokio::test]
async fn test_end_exam_purges_records_including_expired() {
    let mut app = TestApp::new();
    app.join("A").await;
    app.join("B").await;
    app.join("C").await;
    app.request(
        "POST",
        "/api/students/A/shutdown",
        Some(json!({ "examId": EXAM })),
    )
    .await;
    app.clock.advance_seconds(700);
    app.realtime.coordinator.sweep_expired().await;
    app.request(
        "POST",
        "/api/students/B/shutdown",
        Some(json!({ "examId": EXAM })),
    )
    .await;
    assert_eq!(app.realtime.ledger.len(), 2);
    app.drain_events();

    let response = app
        .request("POST", &format!("/api/exams/{EXAM}/end"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["purgedRecords"], 2);
    assert_eq!(response.body["clearedPresence"], 1);
    assert!(app.realtime.ledger.is_empty());

    let events = app.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        OutboundMessage::ExamEnd { student_id: None, action: ExamEndAction::ExamClosed, .. }
    )));

    let c = app.realtime.registry.get(&"C".into()).unwrap();
    assert!(c.exam_id.is_none());
}
