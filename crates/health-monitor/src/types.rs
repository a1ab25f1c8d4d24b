//! Runtime configuration and report types for the health monitor.

use probe::{HealthStatus, InstanceHealthState, ProbeOutcome, ProbeProtocol, Thresholds};
use serde::{Deserialize, Serialize};
use service_registry::{Metadata, ServiceInstance};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Address of the HTTP API (and metrics endpoint)
    pub listen_addr: SocketAddr,

    /// Time between probe cycles
    pub probe_interval: Duration,

    pub http_timeout: Duration,
    pub tcp_timeout: Duration,

    /// Hysteresis thresholds
    pub thresholds: Thresholds,

    /// Headers attached to every HTTP probe
    pub http_headers: Vec<(String, String)>,

    /// Worker pool size shared by all probes of a cycle
    pub max_concurrent_probes: usize,

    pub metrics_enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            probe_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(5),
            tcp_timeout: Duration::from_secs(3),
            thresholds: Thresholds::default(),
            http_headers: Vec::new(),
            max_concurrent_probes: 64,
            metrics_enabled: true,
        }
    }
}

/// Snapshot of an instance's health as served to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub service_id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub status: HealthStatus,

    /// Time of the probe that produced this report
    #[serde(default, with = "humantime_serde")]
    pub last_probe: Option<SystemTime>,

    pub last_probe_type: Option<ProbeProtocol>,
    pub message: Option<String>,
    pub metadata: Metadata,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,

    /// Latency of the last probe in milliseconds
    pub latency_ms: Option<u64>,
}

impl HealthReport {
    /// Build a report from an instance record and its latest health state.
    pub fn new(
        instance: &ServiceInstance,
        state: &InstanceHealthState,
        outcome: Option<&ProbeOutcome>,
    ) -> Self {
        Self {
            service_id: instance.service_id.clone(),
            service_name: instance.service_name.clone(),
            address: instance.address.clone(),
            port: instance.port,
            status: state.status,
            last_probe: state.last_probe_at,
            last_probe_type: state.last_probe_type,
            message: state.last_message.clone(),
            metadata: instance.metadata.clone(),
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            latency_ms: outcome.map(|o| o.latency.as_millis() as u64),
        }
    }

    /// Replace the descriptive instance fields, keeping the health fields.
    pub fn refresh_instance(&mut self, instance: &ServiceInstance) {
        self.service_name = instance.service_name.clone();
        self.address = instance.address.clone();
        self.port = instance.port;
        self.metadata = instance.metadata.clone();
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// What one probe cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Active instances in the cycle's snapshot
    pub instances: usize,

    /// Probes handed to the worker pool
    pub dispatched: usize,

    /// Results applied to the state machine
    pub applied: usize,

    /// Results dropped because the instance left mid-flight
    pub discarded: usize,

    /// Status transitions fired
    pub transitions: usize,

    pub duration: Duration,

    /// Dispatch stopped early on shutdown
    pub cancelled: bool,
}
