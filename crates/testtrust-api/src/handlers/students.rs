//! Instructor student-control handlers: shutdown, power-on, roster.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::{Value, json};

use testtrust_core::types::id::{ExamId, StudentId};

use crate::dto::request::{
    BulkShutdownRequest, PowerOnRequest, ShutdownRequest, StatusQuery, validated,
};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/students/{studentId}/shutdown
pub async fn shutdown_student(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
    Json(req): Json<ShutdownRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let coordinator = state.coordinator();
    let record = coordinator
        .shutdown_student(&student_id, &req.exam_id, req.instructor_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "shutdownRecord": record.view(coordinator.now()),
    })))
}

/// POST /api/students/{studentId}/poweron
pub async fn power_on_student(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
    Json(req): Json<PowerOnRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let remaining = state
        .coordinator()
        .power_on(&student_id, &req.exam_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "timeRemainingSeconds": remaining,
    })))
}

/// POST /api/students/bulk-shutdown
pub async fn bulk_shutdown(
    State(state): State<AppState>,
    Json(req): Json<BulkShutdownRequest>,
) -> Result<Json<Value>, ApiError> {
    let req = validated(req)?;
    let results = state
        .coordinator()
        .bulk_shutdown(&req.student_ids, &req.exam_id, req.instructor_id)
        .await?;
    let shut_down = results.iter().filter(|r| r.success).count();

    Ok(Json(json!({
        "success": true,
        "shutDown": shut_down,
        "results": results,
    })))
}

/// GET /api/students/status?examId=
pub async fn student_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let exam_id = query.exam_id.filter(|e| !e.is_blank());
    let students = state.coordinator().roster(exam_id.as_ref()).await?;
    let online = students.iter().filter(|s| s.online).count();

    Ok(Json(json!({
        "success": true,
        "examId": exam_id,
        "online": online,
        "offline": students.len() - online,
        "students": students,
    })))
}

/// GET /api/students/shutdown-records/{examId}
pub async fn shutdown_records(
    State(state): State<AppState>,
    Path(exam_id): Path<ExamId>,
) -> Result<Json<Value>, ApiError> {
    let records = state.coordinator().shutdown_records(&exam_id).await?;

    Ok(Json(json!({
        "success": true,
        "examId": exam_id,
        "records": records,
    })))
}

/// GET /api/students/connected-count/{examId}
pub async fn connected_count(
    State(state): State<AppState>,
    Path(exam_id): Path<ExamId>,
) -> Result<Json<Value>, ApiError> {
    let count = state.coordinator().connected_count(&exam_id).await?;

    Ok(Json(json!({
        "success": true,
        "totalStudents": count.total_students,
        "connectedStudents": count.connected_students,
        "offlineStudents": count.offline_students,
    })))
}

/// GET /api/students/{studentId}/shutdown-record
pub async fn shutdown_record(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Json<Value>, ApiError> {
    let record = state.coordinator().shutdown_record(&student_id)?;

    Ok(Json(json!({
        "success": true,
        "shutdownRecord": record,
    })))
}
