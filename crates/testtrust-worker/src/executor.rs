//! Task executor: the trait every periodic task implements.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use testtrust_core::error::AppError;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledTask: Send + Sync + std::fmt::Debug + 'static {
    /// Task name used in logs.
    fn name(&self) -> &str;

    /// Six-field cron expression (seconds first).
    fn schedule(&self) -> &str;

    /// Execute once. The returned value is logged as the task summary.
    async fn run(&self) -> Result<Option<Value>, TaskError>;
}

/// Error from task execution
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Failure that the next run may not hit
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Run a task once and log the outcome. Failures never propagate.
pub async fn execute(task: &dyn ScheduledTask) -> bool {
    let started = Instant::now();
    match task.run().await {
        Ok(summary) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match summary {
                Some(summary) => {
                    tracing::info!(task = task.name(), elapsed_ms, summary = %summary, "Task completed")
                }
                None => tracing::debug!(task = task.name(), elapsed_ms, "Task completed"),
            }
            true
        }
        Err(e) => {
            tracing::error!(task = task.name(), error = %e, "Task failed");
            false
        }
    }
}
