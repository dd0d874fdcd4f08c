//! Cron scheduler for periodic session tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use testtrust_core::config::SessionConfig;
use testtrust_core::error::AppError;
use testtrust_realtime::SessionCoordinator;

use crate::executor::{self, ScheduledTask};
use crate::jobs::{ExpirySweepTask, PresenceReconciliationTask};

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Names of registered tasks
    registered: Vec<String>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            registered: Vec::new(),
        })
    }

    /// Register the expiry sweep and presence reconciliation.
    pub async fn register_session_tasks(
        &mut self,
        coordinator: Arc<SessionCoordinator>,
        config: &SessionConfig,
    ) -> Result<(), AppError> {
        self.register(Arc::new(ExpirySweepTask::new(
            coordinator.clone(),
            config.sweep_schedule.clone(),
        )))
        .await?;
        self.register(Arc::new(PresenceReconciliationTask::new(
            coordinator,
            config.reconcile_schedule.clone(),
        )))
        .await?;

        tracing::info!(count = self.registered.len(), "All scheduled tasks registered");
        Ok(())
    }

    /// Register one task on its own schedule.
    pub async fn register(&mut self, task: Arc<dyn ScheduledTask>) -> Result<(), AppError> {
        let name = task.name().to_string();
        let schedule = task.schedule().to_string();

        let job_task = Arc::clone(&task);
        let job = CronJob::new_async(schedule.as_str(), move |_uuid, _lock| {
            let task = Arc::clone(&job_task);
            Box::pin(async move {
                executor::execute(task.as_ref()).await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        tracing::info!(task = %name, schedule = %schedule, "Registered scheduled task");
        self.registered.push(name);
        Ok(())
    }

    /// Names of registered tasks, in registration order.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use testtrust_core::config::RealtimeConfig;
    use testtrust_core::error::ErrorKind;
    use testtrust_core::traits::clock::ManualClock;
    use testtrust_directory::MemoryExamDirectory;
    use testtrust_realtime::{MemoryBus, RealtimeEngine};

    use super::*;

    fn coordinator() -> Arc<SessionCoordinator> {
        RealtimeEngine::with_bus(
            RealtimeConfig::default(),
            SessionConfig::default(),
            Arc::new(MemoryExamDirectory::new()),
            Arc::new(ManualClock::new(Utc::now())),
            Arc::new(MemoryBus::default()),
        )
        .coordinator
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_registers_both_session_tasks() {
        let mut scheduler = CronScheduler::new().await.unwrap();
        scheduler
            .register_session_tasks(coordinator(), &SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(
            scheduler.registered(),
            ["expiry_sweep", "presence_reconciliation"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_schedule_is_a_configuration_error() {
        let mut scheduler = CronScheduler::new().await.unwrap();
        let config = SessionConfig {
            sweep_schedule: "every thirty seconds".to_string(),
            ..SessionConfig::default()
        };
        let err = scheduler
            .register_session_tasks(coordinator(), &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
