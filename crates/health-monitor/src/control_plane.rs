//! Registry, health tracker and report cache behind one handle.
//!
//! API handlers mutate instances through [`ControlPlane`], and the probe
//! scheduler feeds outcomes back through [`ControlPlane::apply_outcome`], so
//! the tracker and cache always follow registry lifecycle changes.

use crate::cache::HealthReportCache;
use crate::metrics::MetricsRegistry;
use crate::types::HealthReport;
use probe::{HealthTracker, ProbeOutcome, Thresholds, Transition};
use service_registry::{
    ServiceInstance, ServiceMetadataSummary, ServiceRegistration, ServiceRegistry,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of feeding one probe outcome into the state machine
#[derive(Debug, Clone)]
pub struct AppliedOutcome {
    pub report: HealthReport,
    pub transition: Option<Transition>,
}

pub struct ControlPlane {
    registry: ServiceRegistry,
    tracker: HealthTracker,
    cache: HealthReportCache,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ControlPlane {
    pub fn new(thresholds: Thresholds, metrics: Option<Arc<MetricsRegistry>>) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            tracker: HealthTracker::new(thresholds),
            cache: HealthReportCache::new(),
            metrics,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &HealthReportCache {
        &self.cache
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsRegistry>> {
        self.metrics.as_ref()
    }

    /// Register or re-register an instance.
    ///
    /// Reviving a deregistered id starts from a fresh health state; updating
    /// an active one keeps its counters.
    pub fn register(&self, registration: ServiceRegistration) -> common::Result<ServiceInstance> {
        let registered = self.registry.register(registration)?;

        if registered.is_revival() {
            self.forget_health(&registered.instance.service_id, &registered.instance.service_name);
            info!(
                service_id = %registered.instance.service_id,
                "Re-registered after deregistration, health state reset"
            );
        } else {
            self.cache.refresh_instance(&registered.instance);
        }

        Ok(registered.instance)
    }

    /// Stop probing an instance. Its last report stays queryable.
    pub fn deregister(&self, service_id: &str) -> common::Result<ServiceInstance> {
        let instance = self.registry.deregister(service_id)?;
        self.tracker.remove(service_id);
        if let Some(ref m) = self.metrics {
            m.remove_instance(&instance.service_id, &instance.service_name);
        }
        Ok(instance)
    }

    /// Merge metadata into an instance without touching its health counters.
    pub fn update_metadata<K, V>(
        &self,
        service_id: &str,
        updates: impl IntoIterator<Item = (K, V)>,
    ) -> common::Result<ServiceInstance>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let instance = self.registry.update_metadata(service_id, updates)?;
        self.cache.refresh_instance(&instance);
        Ok(instance)
    }

    pub fn get_instance(&self, service_id: &str) -> common::Result<ServiceInstance> {
        self.registry.get(service_id)
    }

    pub fn list_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.registry.list_by_service_name(service_name)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.registry.service_names()
    }

    /// Active instances of a service whose latest report is healthy
    pub fn healthy_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.registry
            .list_by_service_name(service_name)
            .into_iter()
            .filter(|instance| instance.is_active())
            .filter(|instance| {
                self.cache
                    .get(&instance.service_id)
                    .is_ok_and(|report| report.is_healthy())
            })
            .collect()
    }

    pub fn metadata_summary(&self, service_name: &str) -> ServiceMetadataSummary {
        self.registry.metadata_summary(service_name)
    }

    pub fn status(&self) -> Vec<HealthReport> {
        self.cache.get_all()
    }

    pub fn status_by_service(&self, service_name: &str) -> Vec<HealthReport> {
        self.cache.get_by_service(service_name)
    }

    /// Remove a report and its health state.
    ///
    /// A deregistered instance is forgotten by the registry as well, whether
    /// or not it was ever probed; an active one keeps being probed and starts
    /// over from `Unknown`. Fails only when `service_id` is unknown to both
    /// the cache and the registry.
    pub fn purge_report(&self, service_id: &str) -> common::Result<HealthReport> {
        let cached = self.cache.purge(service_id).ok();
        let state = self.tracker.remove(service_id);
        let purged = self.registry.purge_deregistered(service_id);

        let report = match cached {
            Some(report) => report,
            None => {
                // Never probed, or its last result was discarded
                let instance = match purged {
                    Some(ref instance) => instance.clone(),
                    None => self
                        .registry
                        .get(service_id)
                        .map_err(|_| common::Error::report_not_found(service_id))?,
                };
                HealthReport::new(&instance, &state.unwrap_or_default(), None)
            }
        };

        if let Some(ref m) = self.metrics {
            m.remove_instance(&report.service_id, &report.service_name);
        }
        if purged.is_some() {
            debug!(service_id, "Dropped deregistered instance with its report");
        }

        info!(service_id, "Purged health report");
        Ok(report)
    }

    /// Feed one probe outcome for `instance` into the state machine and
    /// publish the resulting report.
    ///
    /// Returns `None` when the instance is no longer active; the result is
    /// then discarded.
    pub fn apply_outcome(
        &self,
        instance: &ServiceInstance,
        outcome: &ProbeOutcome,
    ) -> Option<AppliedOutcome> {
        if let Some(ref m) = self.metrics {
            m.record_probe(&instance.service_name, instance.protocol, outcome.kind, outcome.latency);
        }

        // Prefer the current record so the report reflects mid-flight updates
        let current = match self.registry.get(&instance.service_id) {
            Ok(current) if current.is_active() => current,
            _ => return self.discard(instance),
        };

        let (state, transition) = self
            .tracker
            .record(&current.service_id, outcome, instance.protocol);

        // Deregistered between the check and the update
        if !self.registry.is_active(&current.service_id) {
            self.tracker.remove(&current.service_id);
            return self.discard(instance);
        }

        if !outcome.success {
            warn!(
                service_id = %current.service_id,
                target = %instance.probe_target().authority(),
                kind = outcome.kind.as_str(),
                message = %outcome.message,
                "Probe failed"
            );
        }

        let report = HealthReport::new(&current, &state, Some(outcome));
        self.cache.update(report.clone());

        if let Some(ref m) = self.metrics {
            m.update_instance(
                &current.service_id,
                &current.service_name,
                state.status,
                state.consecutive_successes,
                state.consecutive_failures,
            );
            if let Some(t) = transition {
                m.record_transition(&current.service_name, t.from, t.to);
            }

            // A deregistration racing the write above may already have
            // cleared the gauges
            if !self.registry.is_active(&current.service_id) {
                m.remove_instance(&current.service_id, &current.service_name);
            }
        }

        Some(AppliedOutcome { report, transition })
    }

    fn discard(&self, instance: &ServiceInstance) -> Option<AppliedOutcome> {
        debug!(
            service_id = %instance.service_id,
            "Instance left the registry while probing, result discarded"
        );
        if let Some(ref m) = self.metrics {
            m.record_discarded();
        }
        None
    }

    fn forget_health(&self, service_id: &str, service_name: &str) {
        self.tracker.remove(service_id);
        let _ = self.cache.purge(service_id);
        if let Some(ref m) = self.metrics {
            m.remove_instance(service_id, service_name);
        }
    }
}
