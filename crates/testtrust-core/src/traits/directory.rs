//! Exam directory abstraction.
//!
//! The exam administration service owns exams, students, and results. The
//! session core only reads from it, through this trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::exam::{ExamSummary, StudentProfile};
use crate::types::id::{ExamId, StudentId};

/// Read-only lookups against the exam administration service.
///
/// Implementations return `Ok(None)` for identifiers that do not resolve and
/// reserve `Err` for transport or upstream failures.
#[async_trait]
pub trait ExamDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look up an exam by id.
    async fn get_exam_by_id(&self, exam_id: &ExamId) -> AppResult<Option<ExamSummary>>;

    /// Look up a student by id.
    async fn get_student(&self, student_id: &StudentId) -> AppResult<Option<StudentProfile>>;

    /// List the students enrolled for an exam.
    async fn list_exam_students(&self, exam_id: &ExamId) -> AppResult<Vec<StudentProfile>>;

    /// Name of the directory backend (for logging and health output).
    fn backend_name(&self) -> &str;
}
