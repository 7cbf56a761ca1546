//! Configuration management for the docrebac server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use docrebac_server::config::ServerConfig;
//!
//! let config = ServerConfig::load("docrebac.yaml")?;
//! // or
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Largest accepted PDP timeout. Authorization checks sit on the request path.
pub const MAX_PDP_TIMEOUT_MS: u64 = 10_000;

const PDP_MODES: [&str; 2] = ["auto", "disabled"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Policy decision point settings
    #[serde(default)]
    pub pdp: PdpSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Relationship store (PDP) settings.
///
/// Environment overrides use the `DOCREBAC_` prefix and `__` separator:
///
/// - `DOCREBAC_PDP__MODE=disabled` - Skip the probe and run in fallback mode
/// - `DOCREBAC_PDP__AGENT_URL=pdp:8181` - PDP agent address
/// - `DOCREBAC_PDP__API_BASE_URL=https://api.example.com` - Relations API
/// - `DOCREBAC_PDP__TIMEOUT_MS=1500` - Per-call timeout
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PdpSettings {
    /// "auto" probes the agent at startup; "disabled" forces fallback mode.
    #[serde(default = "default_pdp_mode")]
    pub mode: String,

    /// Agent address; an `http://` or `https://` prefix is accepted.
    #[serde(default = "default_agent_url")]
    pub agent_url: String,

    /// Relations API base URL used for assign/unassign.
    pub api_base_url: Option<String>,

    /// Timeout for the startup probe and every store call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PdpSettings {
    fn default() -> Self {
        Self {
            mode: default_pdp_mode(),
            agent_url: default_agent_url(),
            api_base_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PdpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_disabled(&self) -> bool {
        self.mode.eq_ignore_ascii_case("disabled")
    }
}

fn default_pdp_mode() -> String {
    "auto".to_string()
}

fn default_agent_url() -> String {
    "localhost:8181".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// For example `DOCREBAC_PDP__TIMEOUT_MS=500` overrides `pdp.timeout_ms`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;
        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !PDP_MODES.contains(&self.pdp.mode.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "pdp.mode must be one of: {:?}, got: {}",
                    PDP_MODES, self.pdp.mode
                ),
            });
        }

        if self.pdp.agent_url.trim().is_empty() {
            return Err(ConfigLoadError::Invalid {
                message: "pdp.agent_url cannot be empty".to_string(),
            });
        }

        if self.pdp.timeout_ms == 0 || self.pdp.timeout_ms > MAX_PDP_TIMEOUT_MS {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "pdp.timeout_ms must be between 1 and {MAX_PDP_TIMEOUT_MS}, got: {}",
                    self.pdp.timeout_ms
                ),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    LOG_LEVELS, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

// DOCREBAC_PDP__AGENT_URL -> pdp.agent_url
fn env_source() -> Environment {
    Environment::with_prefix("DOCREBAC")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pdp:
  mode: auto
  agent_url: "http://pdp.internal:8181"
  api_base_url: "https://api.example.com"
  timeout_ms: 1500

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.pdp.mode, "auto");
        assert_eq!(config.pdp.agent_url, "http://pdp.internal:8181");
        assert_eq!(
            config.pdp.api_base_url.as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(config.pdp.timeout(), Duration::from_millis(1500));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pdp:
  agent_url: "localhost:8181"
  timeout_ms: 1000
"#
        )
        .unwrap();

        std::env::set_var("DOCREBAC_PDP__TIMEOUT_MS", "500");
        std::env::set_var("DOCREBAC_PDP__MODE", "disabled");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("DOCREBAC_PDP__TIMEOUT_MS");
        std::env::remove_var("DOCREBAC_PDP__MODE");

        let config = config.unwrap();
        assert_eq!(config.pdp.timeout_ms, 500);
        assert!(config.pdp.is_disabled());
        assert_eq!(config.pdp.agent_url, "localhost:8181");
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.pdp.mode = "mock".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pdp.mode"));

        for timeout_ms in [0, MAX_PDP_TIMEOUT_MS + 1] {
            let mut config = ServerConfig::default();
            config.pdp.timeout_ms = timeout_ms;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("pdp.timeout_ms"), "{timeout_ms}");
        }

        let mut config = ServerConfig::default();
        config.pdp.agent_url = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pdp.agent_url"));

        let mut config = ServerConfig::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_invalid_config_returns_clear_error() {
        let err = ServerConfig::load("/nonexistent/path/docrebac.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.pdp.mode, "auto");
        assert!(!config.pdp.is_disabled());
        assert_eq!(config.pdp.agent_url, "localhost:8181");
        assert_eq!(config.pdp.api_base_url, None);
        assert_eq!(config.pdp.timeout(), Duration::from_secs(2));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("DOCREBAC_PDP__AGENT_URL", "pdp:9191");

        let config = ServerConfig::from_env();

        std::env::remove_var("DOCREBAC_PDP__AGENT_URL");

        let config = config.unwrap();
        assert_eq!(config.pdp.agent_url, "pdp:9191");
        assert_eq!(config.pdp.timeout_ms, 2000);
    }
}
