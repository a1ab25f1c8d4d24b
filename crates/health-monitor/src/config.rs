//! Configuration loading and validation for the health monitor

use crate::types::MonitorConfig;
use probe::{Thresholds, parse_http_headers};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "HEALTH_MONITOR_CONFIG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for common::Error {
    fn from(err: ConfigError) -> Self {
        common::Error::config(err)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub probing: ProbingSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.probing.validate()?;
        Ok(())
    }
}

/// API listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,
}

/// Probe scheduling and hysteresis settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProbingSettings {
    #[validate(range(min = 1, max = 86400))]
    pub probe_interval_seconds: u64,

    #[validate(range(min = 1, max = 300))]
    pub http_timeout_seconds: u64,

    #[validate(range(min = 1, max = 300))]
    pub tcp_timeout_seconds: u64,

    #[validate(range(min = 1))]
    pub failure_threshold: u32,

    #[validate(range(min = 1))]
    pub recovery_threshold: u32,

    /// Headers attached to every HTTP probe, `Name=Value`
    pub http_headers: Vec<String>,

    #[validate(range(min = 1, max = 10000))]
    pub max_concurrent_probes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for ProbingSettings {
    fn default() -> Self {
        Self {
            probe_interval_seconds: 30,
            http_timeout_seconds: 5,
            tcp_timeout_seconds: 3,
            failure_threshold: 3,
            recovery_threshold: 2,
            http_headers: Vec::new(),
            max_concurrent_probes: 64,
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "health-monitor".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.trim()
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and fully validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        // Header syntax and thresholds are checked by the conversion
        config.to_monitor_config()?;
        Ok(config)
    }

    /// Find configuration file in standard locations.
    ///
    /// An explicit `HEALTH_MONITOR_CONFIG` path is returned even when it does
    /// not exist so that loading reports the error.
    fn find_config_file() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(explicit));
        }

        let mut paths = vec![PathBuf::from("/etc/mesh-health/health-monitor.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./health-monitor.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }

    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/mesh-health/health-monitor.yaml"))
    }

    /// Convert to the runtime configuration
    pub fn to_monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let listen_addr = self
            .server
            .listen_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("listen_addr: {}", e)))?;

        let thresholds = Thresholds::new(
            self.probing.failure_threshold,
            self.probing.recovery_threshold,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let http_headers = parse_http_headers(&self.probing.http_headers)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(MonitorConfig {
            listen_addr,
            probe_interval: Duration::from_secs(self.probing.probe_interval_seconds),
            http_timeout: Duration::from_secs(self.probing.http_timeout_seconds),
            tcp_timeout: Duration::from_secs(self.probing.tcp_timeout_seconds),
            thresholds,
            http_headers,
            max_concurrent_probes: self.probing.max_concurrent_probes,
            metrics_enabled: self.metrics.enabled,
        })
    }
}
