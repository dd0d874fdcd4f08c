//! Exam directory (CRUD collaborator) configuration.

use serde::{Deserialize, Serialize};

/// Which exam directory implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryProvider {
    /// REST calls against the exam administration service.
    Http,
    /// In-process directory seeded at startup.
    #[default]
    Memory,
}

/// Exam directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Provider selection.
    #[serde(default)]
    pub provider: DirectoryProvider,
    /// Base URL of the exam administration REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Lookup cache time-to-live in seconds (0 disables caching).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached lookups.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// JSON file with exams and students loaded into the memory provider.
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            provider: DirectoryProvider::default(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            seed_path: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000/api".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_cache_capacity() -> u64 {
    1000
}
