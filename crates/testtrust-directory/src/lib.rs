//! # testtrust-directory
//!
//! Implementations of [`ExamDirectory`], the read-only view of the exam
//! administration service used by the session core:
//!
//! - **http**: REST client against the exam administration API
//! - **memory**: in-process directory for tests and standalone runs
//! - **cached**: moka-backed TTL cache in front of either

pub mod cached;
pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use testtrust_core::config::{DirectoryConfig, DirectoryProvider};
use testtrust_core::result::AppResult;
use testtrust_core::traits::directory::ExamDirectory;

pub use cached::CachedExamDirectory;
pub use http::HttpExamDirectory;
pub use memory::{DirectorySeed, MemoryExamDirectory};

/// Build the configured exam directory, wrapped in a cache when enabled.
pub fn build_directory(config: &DirectoryConfig) -> AppResult<Arc<dyn ExamDirectory>> {
    let inner: Arc<dyn ExamDirectory> = match config.provider {
        DirectoryProvider::Http => Arc::new(HttpExamDirectory::new(
            &config.base_url,
            Duration::from_secs(config.timeout_seconds),
        )?),
        DirectoryProvider::Memory => {
            let memory = MemoryExamDirectory::new();
            if let Some(path) = &config.seed_path {
                let exams = memory.load_seed(path)?;
                info!(path = %path, exams, "Loaded exam directory seed");
            }
            Arc::new(memory)
        }
    };

    info!(
        backend = inner.backend_name(),
        cache_ttl_seconds = config.cache_ttl_seconds,
        "Exam directory initialized"
    );

    if config.cache_ttl_seconds == 0 {
        return Ok(inner);
    }

    Ok(Arc::new(CachedExamDirectory::new(
        inner,
        config.cache_capacity,
        Duration::from_secs(config.cache_ttl_seconds),
    )))
}
