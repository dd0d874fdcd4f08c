//! Integration tests for health endpoints.

mod helpers;

use axum::http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_reports_engine_stats() {
    let app = TestApp::new();
    app.join("A").await;

    let response = app.request("GET", "/health/detailed", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["directory"], "memory");
    assert_eq!(data["onlineStudents"], 1);
    assert_eq!(data["activeShutdownRecords"], 0);
    assert_eq!(data["metrics"]["studentJoins"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/nope", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
