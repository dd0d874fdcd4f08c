//! Background tasks for the TestTrust session server.
//!
//! This crate provides:
//! - A cron scheduler driving periodic tasks
//! - The [`ScheduledTask`] trait and a runner that logs each execution
//! - The recovery-window expiry sweep and presence reconciliation tasks

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{ScheduledTask, TaskError};
pub use scheduler::CronScheduler;
