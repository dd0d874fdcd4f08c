//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use testtrust_core::error::AppError;
use testtrust_core::types::id::{ExamId, InstructorId, StudentId};

/// Body of `POST /students/{studentId}/shutdown`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownRequest {
    /// Exam the student is being shut down from.
    #[validate(custom(function = "exam_id_present"))]
    pub exam_id: ExamId,
    /// Instructor issuing the command.
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,
}

/// Body of `POST /students/{studentId}/poweron`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PowerOnRequest {
    /// Exam the student was shut down from.
    #[validate(custom(function = "exam_id_present"))]
    pub exam_id: ExamId,
}

/// Body of `POST /students/bulk-shutdown`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkShutdownRequest {
    /// Students to shut down.
    #[validate(length(min = 1, max = 1000, message = "studentIds must not be empty"))]
    pub student_ids: Vec<StudentId>,
    /// Exam the students are being shut down from.
    #[validate(custom(function = "exam_id_present"))]
    pub exam_id: ExamId,
    /// Instructor issuing the command.
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,
}

/// Query of `GET /students/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    /// Restrict the roster to one exam.
    #[serde(default)]
    pub exam_id: Option<ExamId>,
}

fn exam_id_present(exam_id: &ExamId) -> Result<(), ValidationError> {
    if exam_id.is_blank() {
        return Err(ValidationError::new("required").with_message("examId is required".into()));
    }
    Ok(())
}

/// Run `validator` rules and convert failures to a validation error.
pub fn validated<T: Validate>(request: T) -> Result<T, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
    Ok(request)
}
