//! Presence reconciliation: drops entries whose client stopped pinging.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use testtrust_realtime::SessionCoordinator;

use crate::executor::{ScheduledTask, TaskError};

/// Removes presence entries older than the staleness threshold.
#[derive(Debug)]
pub struct PresenceReconciliationTask {
    coordinator: Arc<SessionCoordinator>,
    schedule: String,
}

impl PresenceReconciliationTask {
    /// Create the task with a cron schedule.
    pub fn new(coordinator: Arc<SessionCoordinator>, schedule: impl Into<String>) -> Self {
        Self {
            coordinator,
            schedule: schedule.into(),
        }
    }
}

#[async_trait]
impl ScheduledTask for PresenceReconciliationTask {
    fn name(&self) -> &str {
        "presence_reconciliation"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> Result<Option<Value>, TaskError> {
        let removed = self.coordinator.reconcile_stale().await;
        if removed.is_empty() {
            return Ok(None);
        }
        Ok(Some(json!({ "removed": removed.len() })))
    }
}
