//! Recovery-window expiry sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use testtrust_realtime::SessionCoordinator;

use crate::executor::{ScheduledTask, TaskError};

/// Flags shutdown records whose recovery window has elapsed and announces
/// `exam_failed` for each.
#[derive(Debug)]
pub struct ExpirySweepTask {
    coordinator: Arc<SessionCoordinator>,
    schedule: String,
}

impl ExpirySweepTask {
    /// Create the task with a cron schedule.
    pub fn new(coordinator: Arc<SessionCoordinator>, schedule: impl Into<String>) -> Self {
        Self {
            coordinator,
            schedule: schedule.into(),
        }
    }
}

#[async_trait]
impl ScheduledTask for ExpirySweepTask {
    fn name(&self) -> &str {
        "expiry_sweep"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> Result<Option<Value>, TaskError> {
        let expired = self.coordinator.sweep_expired().await;
        if expired.is_empty() {
            return Ok(None);
        }

        let students: Vec<&str> = expired.iter().map(|r| r.student_id.as_str()).collect();
        Ok(Some(json!({
            "expired": expired.len(),
            "students": students,
        })))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use testtrust_core::config::{RealtimeConfig, SessionConfig};
    use testtrust_core::traits::clock::ManualClock;
    use testtrust_core::types::exam::ExamSummary;
    use testtrust_core::types::id::{ExamId, StudentId, TransportSessionId};
    use testtrust_directory::MemoryExamDirectory;
    use testtrust_realtime::{MemoryBus, RealtimeEngine};

    use super::*;

    #[tokio::test]
    async fn test_sweep_reports_newly_expired_records() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let directory = Arc::new(MemoryExamDirectory::new());
        directory.insert_exam(ExamSummary {
            id: ExamId::new("e1"),
            subject: "Databases".to_string(),
            department: String::new(),
            year: String::new(),
            duration: 60,
            student_count: 1,
            student_ids: Vec::new(),
        });
        let engine = RealtimeEngine::with_bus(
            RealtimeConfig::default(),
            SessionConfig::default(),
            directory,
            clock.clone(),
            Arc::new(MemoryBus::default()),
        );
        let coordinator = engine.coordinator.clone();
        let student = StudentId::new("s1");

        coordinator
            .handle_join(&student, TransportSessionId::new(), Some(ExamId::new("e1")), None)
            .await;
        coordinator
            .shutdown_student(&student, &ExamId::new("e1"), None)
            .await
            .unwrap();

        let task = ExpirySweepTask::new(coordinator, "*/30 * * * * *");
        assert!(task.run().await.unwrap().is_none());

        clock.advance_seconds(600);
        let summary = task.run().await.unwrap().unwrap();
        assert_eq!(summary["expired"], 1);
        assert_eq!(summary["students"][0], "s1");

        assert!(task.run().await.unwrap().is_none());
    }
}
