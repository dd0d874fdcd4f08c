//! Live exam session coordination configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Presence, recovery window, and sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds after a remote shutdown during which power-on is allowed.
    #[serde(default = "default_recovery_window")]
    pub recovery_window_seconds: u64,
    /// Seconds to wait after a transport disconnect before removing presence.
    #[serde(default = "default_disconnect_grace")]
    pub disconnect_grace_seconds: u64,
    /// Interval at which student clients send `student_activity`.
    #[serde(default = "default_activity_interval")]
    pub activity_interval_seconds: u64,
    /// Presence entries not refreshed for this long are reconciled away.
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
    /// Cron expression (with seconds) for the recovery window sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
    /// Cron expression (with seconds) for presence reconciliation.
    #[serde(default = "default_reconcile_schedule")]
    pub reconcile_schedule: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recovery_window_seconds: default_recovery_window(),
            disconnect_grace_seconds: default_disconnect_grace(),
            activity_interval_seconds: default_activity_interval(),
            stale_after_seconds: default_stale_after(),
            sweep_schedule: default_sweep_schedule(),
            reconcile_schedule: default_reconcile_schedule(),
        }
    }
}

impl SessionConfig {
    /// Grace period as a [`Duration`].
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_seconds)
    }

    /// Recovery window as a chrono duration.
    pub fn recovery_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recovery_window_seconds as i64)
    }
}

fn default_recovery_window() -> u64 {
    600
}

fn default_disconnect_grace() -> u64 {
    3
}

fn default_activity_interval() -> u64 {
    30
}

fn default_stale_after() -> u64 {
    90
}

fn default_sweep_schedule() -> String {
    "*/30 * * * * *".to_string()
}

fn default_reconcile_schedule() -> String {
    "*/30 * * * * *".to_string()
}
