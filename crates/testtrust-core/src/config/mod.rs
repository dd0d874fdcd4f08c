//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `TESTTRUST__*` environment variables. Each
//! sub-module represents a logical configuration section.

pub mod app;
pub mod directory;
pub mod logging;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::directory::{DirectoryConfig, DirectoryProvider};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Every section has serde defaults, so an empty configuration source
/// yields a runnable development setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Live session coordination settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Exam directory (CRUD collaborator) settings.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl AppConfig {
    /// Load configuration for the given environment.
    ///
    /// Merges `config/default`, `config/{env}` (both optional) and
    /// environment variables prefixed with `TESTTRUST`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TESTTRUST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from a TOML string (used by tests and tooling).
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.session.recovery_window_seconds, 600);
        assert_eq!(config.session.disconnect_grace_seconds, 3);
        assert_eq!(config.session.sweep_schedule, "*/30 * * * * *");
        assert_eq!(config.directory.provider, DirectoryProvider::Memory);
    }

    #[test]
    fn test_partial_section_override() {
        let config = AppConfig::from_toml(
            r#"
            [session]
            recovery_window_seconds = 120

            [directory]
            provider = "http"
            base_url = "http://crud.internal:4000/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.recovery_window_seconds, 120);
        assert_eq!(config.session.disconnect_grace_seconds, 3);
        assert_eq!(config.directory.provider, DirectoryProvider::Http);
        assert_eq!(config.directory.base_url, "http://crud.internal:4000/api");
    }
}
