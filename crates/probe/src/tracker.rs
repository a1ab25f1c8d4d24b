//! Per-instance health state table.

use crate::hysteresis::{InstanceHealthState, Thresholds, Transition, advance};
use crate::types::{HealthStatus, ProbeOutcome, ProbeProtocol};
use dashmap::DashMap;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Owns one [`InstanceHealthState`] per service id.
///
/// Entries live in a sharded map; an update holds only its own shard lock
/// for the duration of the pure transition, so instances never block each
/// other on the probe path.
pub struct HealthTracker {
    states: DashMap<String, InstanceHealthState>,
    thresholds: Thresholds,
}

impl HealthTracker {
    /// Create a new tracker
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            states: DashMap::new(),
            thresholds,
        }
    }

    /// Apply one outcome to an instance, creating its state on first probe.
    pub fn record(
        &self,
        service_id: &str,
        outcome: &ProbeOutcome,
        protocol: ProbeProtocol,
    ) -> (InstanceHealthState, Option<Transition>) {
        let mut entry = self.states.entry(service_id.to_string()).or_default();
        let (next, transition) = advance(&entry, outcome, protocol, self.thresholds, SystemTime::now());
        *entry = next.clone();
        drop(entry);

        match transition {
            Some(Transition {
                from,
                to: HealthStatus::Healthy,
            }) => {
                info!(
                    service_id,
                    from = %from,
                    recovery = self.thresholds.recovery,
                    "Instance is now HEALTHY (recovery threshold met)"
                );
            }
            Some(Transition { from, to }) => {
                warn!(
                    service_id,
                    from = %from,
                    to = %to,
                    failure = self.thresholds.failure,
                    "Instance is now UNHEALTHY (failure threshold met)"
                );
            }
            None => {
                debug!(
                    service_id,
                    status = %next.status,
                    successes = next.consecutive_successes,
                    failures = next.consecutive_failures,
                    "Probe outcome recorded"
                );
            }
        }

        (next, transition)
    }

    /// Copy of an instance's state
    pub fn get(&self, service_id: &str) -> Option<InstanceHealthState> {
        self.states.get(service_id).map(|entry| entry.value().clone())
    }

    /// Drop an instance's state (deregistration or purge)
    pub fn remove(&self, service_id: &str) -> Option<InstanceHealthState> {
        self.states.remove(service_id).map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Count of tracked instances per status: (healthy, unhealthy, unknown)
    pub fn counts_by_status(&self) -> (usize, usize, usize) {
        self.states
            .iter()
            .fold((0, 0, 0), |(healthy, unhealthy, unknown), entry| match entry.status {
                HealthStatus::Healthy => (healthy + 1, unhealthy, unknown),
                HealthStatus::Unhealthy => (healthy, unhealthy + 1, unknown),
                HealthStatus::Unknown => (healthy, unhealthy, unknown + 1),
            })
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}
