//! Prometheus metrics for the health monitor.

use crate::types::CycleSummary;
use probe::{HealthStatus, ProbeKind, ProbeProtocol};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for per-instance metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct InstanceLabels {
    pub service_id: String,
    pub service_name: String,
}

/// Labels for probe result metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    pub service_name: String,
    /// Probe protocol (http, tcp)
    pub protocol: String,
    /// Outcome kind (success, timeout, connection_refused, protocol_error, unknown)
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProtocolLabels {
    pub protocol: String,
}

/// Labels for status transition metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TransitionLabels {
    pub service_name: String,
    pub from: String,
    pub to: String,
}

/// Labels for status-based metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabels {
    /// Status (healthy, unhealthy, unknown)
    pub status: String,
}

/// Labels for API lookup misses
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResourceLabels {
    pub resource: String,
}

/// Metrics registry with all health monitor metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    // Per-probe metrics
    probes_total: Family<ProbeLabels, Counter>,
    probe_latency_seconds: Family<ProtocolLabels, Histogram>,
    probes_discarded_total: Counter,

    // Per-instance metrics
    /// Current health status (0=unknown, 1=healthy, 2=unhealthy)
    instance_status: Family<InstanceLabels, Gauge>,
    consecutive_successes: Family<InstanceLabels, Gauge>,
    consecutive_failures: Family<InstanceLabels, Gauge>,
    status_transitions_total: Family<TransitionLabels, Counter>,

    // System-wide metrics
    instances_active: Gauge,
    instances_by_status: Family<StatusLabels, Gauge>,
    cycles_total: Counter,
    cycle_duration_seconds: Histogram,
    api_not_found_total: Family<ResourceLabels, Counter>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "mesh_health_probes",
            "Total probes executed",
            probes_total.clone(),
        );

        let probe_latency_seconds = Family::<ProtocolLabels, Histogram>::new_with_constructor(|| {
            // Exponential buckets from 1ms to ~16s
            Histogram::new(exponential_buckets(0.001, 2.0, 15))
        });
        registry.register(
            "mesh_health_probe_latency_seconds",
            "Probe latency in seconds",
            probe_latency_seconds.clone(),
        );

        let probes_discarded_total = Counter::default();
        registry.register(
            "mesh_health_probes_discarded",
            "Probe results dropped because the instance was deregistered mid-flight",
            probes_discarded_total.clone(),
        );

        let instance_status = Family::<InstanceLabels, Gauge>::default();
        registry.register(
            "mesh_health_instance_status",
            "Current health status (0=unknown, 1=healthy, 2=unhealthy)",
            instance_status.clone(),
        );

        let consecutive_successes = Family::<InstanceLabels, Gauge>::default();
        registry.register(
            "mesh_health_consecutive_successes",
            "Current consecutive success count",
            consecutive_successes.clone(),
        );

        let consecutive_failures = Family::<InstanceLabels, Gauge>::default();
        registry.register(
            "mesh_health_consecutive_failures",
            "Current consecutive failure count",
            consecutive_failures.clone(),
        );

        let status_transitions_total = Family::<TransitionLabels, Counter>::default();
        registry.register(
            "mesh_health_status_transitions",
            "Total health status transitions",
            status_transitions_total.clone(),
        );

        let instances_active = Gauge::default();
        registry.register(
            "mesh_health_instances_active",
            "Number of active (registered) instances",
            instances_active.clone(),
        );

        let instances_by_status = Family::<StatusLabels, Gauge>::default();
        registry.register(
            "mesh_health_instances_by_status",
            "Tracked instances by health status",
            instances_by_status.clone(),
        );

        let cycles_total = Counter::default();
        registry.register(
            "mesh_health_probe_cycles",
            "Total probe cycles run",
            cycles_total.clone(),
        );

        let cycle_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 16));
        registry.register(
            "mesh_health_probe_cycle_duration_seconds",
            "Probe cycle duration",
            cycle_duration_seconds.clone(),
        );

        let api_not_found_total = Family::<ResourceLabels, Counter>::default();
        registry.register(
            "mesh_health_api_not_found",
            "API lookups that found nothing",
            api_not_found_total.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_latency_seconds,
            probes_discarded_total,
            instance_status,
            consecutive_successes,
            consecutive_failures,
            status_transitions_total,
            instances_active,
            instances_by_status,
            cycles_total,
            cycle_duration_seconds,
            api_not_found_total,
        }
    }

    /// Record one probe outcome
    pub fn record_probe(
        &self,
        service_name: &str,
        protocol: ProbeProtocol,
        kind: ProbeKind,
        latency: Duration,
    ) {
        self.probes_total
            .get_or_create(&ProbeLabels {
                service_name: service_name.to_string(),
                protocol: protocol.as_str().to_string(),
                kind: kind.as_str().to_string(),
            })
            .inc();

        self.probe_latency_seconds
            .get_or_create(&ProtocolLabels {
                protocol: protocol.as_str().to_string(),
            })
            .observe(latency.as_secs_f64());
    }

    pub fn record_discarded(&self) {
        self.probes_discarded_total.inc();
    }

    /// Update status and consecutive-count gauges of one instance
    pub fn update_instance(
        &self,
        service_id: &str,
        service_name: &str,
        status: HealthStatus,
        successes: u32,
        failures: u32,
    ) {
        let labels = InstanceLabels {
            service_id: service_id.to_string(),
            service_name: service_name.to_string(),
        };

        self.instance_status
            .get_or_create(&labels)
            .set(status_value(status));
        self.consecutive_successes
            .get_or_create(&labels)
            .set(successes as i64);
        self.consecutive_failures
            .get_or_create(&labels)
            .set(failures as i64);
    }

    /// Drop the per-instance gauges of an instance that is no longer tracked
    pub fn remove_instance(&self, service_id: &str, service_name: &str) {
        let labels = InstanceLabels {
            service_id: service_id.to_string(),
            service_name: service_name.to_string(),
        };
        self.instance_status.remove(&labels);
        self.consecutive_successes.remove(&labels);
        self.consecutive_failures.remove(&labels);
    }

    /// Record a status transition
    pub fn record_transition(&self, service_name: &str, from: HealthStatus, to: HealthStatus) {
        self.status_transitions_total
            .get_or_create(&TransitionLabels {
                service_name: service_name.to_string(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
            .inc();
    }

    pub fn update_instance_count(&self, count: usize) {
        self.instances_active.set(count as i64);
    }

    /// Update instances by status count
    pub fn update_instances_by_status(&self, healthy: usize, unhealthy: usize, unknown: usize) {
        for (status, count) in [
            (HealthStatus::Healthy, healthy),
            (HealthStatus::Unhealthy, unhealthy),
            (HealthStatus::Unknown, unknown),
        ] {
            self.instances_by_status
                .get_or_create(&StatusLabels {
                    status: status.as_str().to_string(),
                })
                .set(count as i64);
        }
    }

    /// Record a finished probe cycle
    pub fn record_cycle(&self, summary: &CycleSummary) {
        self.cycles_total.inc();
        self.cycle_duration_seconds
            .observe(summary.duration.as_secs_f64());
    }

    /// Record an API lookup miss by resource kind
    pub fn record_not_found(&self, resource: &str) {
        self.api_not_found_total
            .get_or_create(&ResourceLabels {
                resource: resource.to_string(),
            })
            .inc();
    }

    /// Encode every metric in Prometheus text format
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn status_value(status: HealthStatus) -> i64 {
    match status {
        HealthStatus::Unknown => 0,
        HealthStatus::Healthy => 1,
        HealthStatus::Unhealthy => 2,
    }
}
