//! Integration tests for the instructor student-control endpoints.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{EXAM, TestApp};
use testtrust_realtime::message::types::OutboundMessage;

#[tokio::test]
async fn test_shutdown_then_power_on_within_window() {
    let mut app = TestApp::new();
    app.join("S").await;
    app.drain_events();

    let response = app
        .request(
            "POST",
            "/api/students/S/shutdown",
            Some(json!({ "examId": EXAM, "instructorId": "inst-1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["shutdownRecord"]["studentId"], "S");
    assert_eq!(response.body["shutdownRecord"]["canPowerOn"], true);
    assert_eq!(response.body["shutdownRecord"]["timeRemainingSeconds"], 600);

    let events = app.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        OutboundMessage::ExamEnd { student_id: Some(s), .. } if s.as_str() == "S"
    )));
    assert!(!app.realtime.registry.is_online(&"S".into()));

    app.clock.advance_seconds(10);
    let response = app
        .request("GET", "/api/students/S/shutdown-record", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["shutdownRecord"]["timeRemainingSeconds"], 590);

    let response = app
        .request(
            "POST",
            "/api/students/S/poweron",
            Some(json!({ "examId": EXAM })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["timeRemainingSeconds"], 590);

    let events = app.drain_events();
    assert!(events.iter().any(|e| e.event_name() == "start_exam"));

    let response = app
        .request("GET", "/api/students/S/shutdown-record", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shutdown_offline_student_is_not_found() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/students/A/shutdown",
            Some(json!({ "examId": EXAM })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "Student is not currently connected");
    assert!(app.realtime.ledger.is_empty());
}

#[tokio::test]
async fn test_shutdown_unknown_exam_is_not_found() {
    let app = TestApp::new();
    app.join("A").await;

    let response = app
        .request(
            "POST",
            "/api/students/A/shutdown",
            Some(json!({ "examId": "no-such-exam" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(app.realtime.registry.is_online(&"A".into()));
}

#[tokio::test]
async fn test_shutdown_blank_exam_id_is_rejected() {
    let app = TestApp::new();
    app.join("A").await;

    let response = app
        .request(
            "POST",
            "/api/students/A/shutdown",
            Some(json!({ "examId": "   " })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_power_on_after_expiry_is_rejected() {
    let mut app = TestApp::new();
    app.join("S").await;
    app.request(
        "POST",
        "/api/students/S/shutdown",
        Some(json!({ "examId": EXAM })),
    )
    .await;

    app.clock.advance_seconds(610);
    let expired = app.realtime.coordinator.sweep_expired().await;
    assert_eq!(expired.len(), 1);

    let events = app.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        OutboundMessage::ExamFailed { grade, .. } if grade == "F"
    )));

    app.clock.advance_seconds(1);
    let response = app
        .request(
            "POST",
            "/api/students/S/poweron",
            Some(json!({ "examId": EXAM })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Power-on window has expired");
}

#[tokio::test]
async fn test_power_on_without_record_is_not_found() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/students/A/poweron",
            Some(json!({ "examId": EXAM })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_shutdown_reports_each_student() {
    let app = TestApp::new();
    app.join("A").await;
    app.join("C").await;

    let response = app
        .request(
            "POST",
            "/api/students/bulk-shutdown",
            Some(json!({ "examId": EXAM, "studentIds": ["A", "B", "C"] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    let results = response.body["results"].as_array().unwrap();
    let summary: Vec<(&str, &str, bool)> = results
        .iter()
        .map(|r| {
            (
                r["studentId"].as_str().unwrap(),
                r["status"].as_str().unwrap(),
                r["success"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("A", "shutdown", true),
            ("B", "not_connected", false),
            ("C", "shutdown", true),
        ]
    );
    assert_eq!(app.realtime.ledger.len(), 2);
}

#[tokio::test]
async fn test_bulk_shutdown_requires_students() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/students/bulk-shutdown",
            Some(json!({ "examId": EXAM, "studentIds": [] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_and_connected_count() {
    let app = TestApp::new();
    app.join("A").await;
    app.join("B").await;
    app.request(
        "POST",
        "/api/students/B/shutdown",
        Some(json!({ "examId": EXAM })),
    )
    .await;

    let response = app
        .request("GET", &format!("/api/students/connected-count/{EXAM}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalStudents"], 4);
    assert_eq!(response.body["connectedStudents"], 1);
    assert_eq!(response.body["offlineStudents"], 3);

    let response = app
        .request("GET", &format!("/api/students/status?examId={EXAM}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["online"], 1);
    let students = response.body["students"].as_array().unwrap();
    assert_eq!(students.len(), 4);
    let b = students.iter().find(|s| s["studentId"] == "B").unwrap();
    assert_eq!(b["status"], "shutdown_pending");
    assert_eq!(b["online"], false);

    let response = app
        .request("GET", &format!("/api/students/shutdown-records/{EXAM}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let records = response.body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["studentId"], "B");
}

#[tokio::test]
async fn test_connected_count_unknown_exam_is_not_found() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/students/connected-count/nope", None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
