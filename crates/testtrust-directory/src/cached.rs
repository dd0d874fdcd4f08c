//! TTL cache in front of an exam directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use testtrust_core::result::AppResult;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_core::types::exam::{ExamSummary, StudentProfile};
use testtrust_core::types::id::{ExamId, StudentId};

/// Caches successful exam and student lookups.
///
/// Misses are not cached: an exam created moments ago must become visible
/// on the next lookup.
#[derive(Debug, Clone)]
pub struct CachedExamDirectory {
    inner: Arc<dyn ExamDirectory>,
    exams: Cache<ExamId, ExamSummary>,
    students: Cache<StudentId, StudentProfile>,
}

impl CachedExamDirectory {
    /// Wrap `inner` with caches of the given capacity and time-to-live.
    pub fn new(inner: Arc<dyn ExamDirectory>, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            exams: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            students: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop a cached exam so the next lookup goes upstream.
    pub async fn invalidate_exam(&self, exam_id: &ExamId) {
        self.exams.invalidate(exam_id).await;
    }
}

#[async_trait]
impl ExamDirectory for CachedExamDirectory {
    async fn get_exam_by_id(&self, exam_id: &ExamId) -> AppResult<Option<ExamSummary>> {
        if let Some(exam) = self.exams.get(exam_id).await {
            debug!(exam_id = %exam_id, "Exam lookup served from cache");
            return Ok(Some(exam));
        }

        let found = self.inner.get_exam_by_id(exam_id).await?;
        if let Some(ref exam) = found {
            self.exams.insert(exam_id.clone(), exam.clone()).await;
        }
        Ok(found)
    }

    async fn get_student(&self, student_id: &StudentId) -> AppResult<Option<StudentProfile>> {
        if let Some(student) = self.students.get(student_id).await {
            return Ok(Some(student));
        }

        let found = self.inner.get_student(student_id).await?;
        if let Some(ref student) = found {
            self.students.insert(student_id.clone(), student.clone()).await;
        }
        Ok(found)
    }

    async fn list_exam_students(&self, exam_id: &ExamId) -> AppResult<Vec<StudentProfile>> {
        self.inner.list_exam_students(exam_id).await
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}
