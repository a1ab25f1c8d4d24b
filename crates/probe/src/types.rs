//! Probe and health types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Metadata key overriding the HTTP probe path.
pub const HEALTH_CHECK_ENDPOINT_KEY: &str = "health_check_endpoint";
/// Metadata key overriding the HTTP probe scheme.
pub const SCHEME_KEY: &str = "scheme";
/// Metadata key overriding the TCP probe port.
pub const TCP_PORT_KEY: &str = "tcp_port";

/// Default HTTP probe path.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Protocol used to probe an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeProtocol {
    #[default]
    Http,
    Tcp,
}

impl ProbeProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeProtocol::Http => "http",
            ProbeProtocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for ProbeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Success,
    Timeout,
    ConnectionRefused,
    ProtocolError,
    Unknown,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Success => "success",
            ProbeKind::Timeout => "timeout",
            ProbeKind::ConnectionRefused => "connection_refused",
            ProbeKind::ProtocolError => "protocol_error",
            ProbeKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of exactly one probe attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// True only when `kind == ProbeKind::Success`
    pub success: bool,

    /// Time spent on the attempt
    pub latency: Duration,

    /// Outcome classification
    pub kind: ProbeKind,

    /// Human readable detail
    pub message: String,

    /// Response code (for HTTP probes that got a response)
    pub status_code: Option<u16>,
}

impl ProbeOutcome {
    /// Create a successful outcome
    pub fn success(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            success: true,
            latency,
            kind: ProbeKind::Success,
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a failed outcome of the given kind
    pub fn failure(kind: ProbeKind, latency: Duration, message: impl Into<String>) -> Self {
        Self {
            success: kind == ProbeKind::Success,
            latency,
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a timeout outcome
    pub fn timeout(latency: Duration) -> Self {
        Self::failure(ProbeKind::Timeout, latency, "Probe timed out")
    }

    /// Attach the HTTP response code
    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }
}

/// Everything the executor needs to probe one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub service_id: String,
    pub address: String,
    pub port: u16,
    pub protocol: ProbeProtocol,

    /// HTTP scheme, `http` unless overridden
    pub scheme: String,

    /// HTTP request path
    pub path: String,
}

impl ProbeTarget {
    /// Build a target from instance coordinates and its metadata lookups.
    ///
    /// `lookup` resolves metadata keys (case-insensitively on the caller side).
    pub fn from_instance<'a>(
        service_id: &str,
        address: &str,
        port: u16,
        protocol: ProbeProtocol,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        let scheme = lookup(SCHEME_KEY)
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| s == "http" || s == "https")
            .unwrap_or_else(|| "http".to_string());

        let path = match lookup(HEALTH_CHECK_ENDPOINT_KEY).map(str::trim) {
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) if !p.is_empty() => format!("/{}", p),
            _ => DEFAULT_HEALTH_PATH.to_string(),
        };

        let port = match protocol {
            ProbeProtocol::Tcp => lookup(TCP_PORT_KEY)
                .and_then(|p| p.trim().parse::<u16>().ok())
                .unwrap_or(port),
            ProbeProtocol::Http => port,
        };

        Self {
            service_id: service_id.to_string(),
            address: address.to_string(),
            port,
            protocol,
            scheme,
            path,
        }
    }

    /// `host:port` form, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// Full URL for HTTP probes.
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority(), self.path)
    }
}

/// Health status of an instance as seen by routing consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HealthStatus {
    /// No threshold has been crossed yet
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "UNKNOWN"),
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}
