//! Exam lifecycle handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use testtrust_core::types::id::ExamId;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/exams/{examId}/start
pub async fn start_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<ExamId>,
) -> Result<Json<Value>, ApiError> {
    let delivered = state.coordinator().start_exam(&exam_id).await?;

    Ok(Json(json!({
        "success": true,
        "examId": exam_id,
        "delivered": delivered,
    })))
}

/// POST /api/exams/{examId}/end
///
/// Drops every shutdown record of the exam, expired ones included.
pub async fn end_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<ExamId>,
) -> Result<Json<Value>, ApiError> {
    let closure = state.coordinator().end_exam(&exam_id).await?;

    Ok(Json(json!({
        "success": true,
        "examId": exam_id,
        "purgedRecords": closure.purged_records,
        "clearedPresence": closure.cleared_presence,
    })))
}
