//! Latest health report per instance.

use crate::types::HealthReport;
use dashmap::DashMap;
use service_registry::ServiceInstance;

/// In-memory map of service id to its most recent [`HealthReport`].
///
/// Writers replace a whole report under the owning shard lock; readers get
/// clones and never see a half-written report.
#[derive(Default)]
pub struct HealthReportCache {
    reports: DashMap<String, HealthReport>,
}

impl HealthReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report, returning the one it replaced
    pub fn update(&self, report: HealthReport) -> Option<HealthReport> {
        self.reports.insert(report.service_id.clone(), report)
    }

    /// Update the descriptive fields of an existing report.
    ///
    /// Returns false when no report exists for the instance.
    pub fn refresh_instance(&self, instance: &ServiceInstance) -> bool {
        match self.reports.get_mut(&instance.service_id) {
            Some(mut report) => {
                report.refresh_instance(instance);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, service_id: &str) -> common::Result<HealthReport> {
        self.reports
            .get(service_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| common::Error::report_not_found(service_id))
    }

    /// Every report, ordered by service id
    pub fn get_all(&self) -> Vec<HealthReport> {
        let mut reports: Vec<HealthReport> = self
            .reports
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        reports.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        reports
    }

    /// Reports of one service (name compared case-insensitively)
    pub fn get_by_service(&self, service_name: &str) -> Vec<HealthReport> {
        let wanted = service_name.to_lowercase();
        let mut reports: Vec<HealthReport> = self
            .reports
            .iter()
            .filter(|entry| entry.service_name.to_lowercase() == wanted)
            .map(|entry| entry.value().clone())
            .collect();
        reports.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        reports
    }

    pub fn purge(&self, service_id: &str) -> common::Result<HealthReport> {
        self.reports
            .remove(service_id)
            .map(|(_, report)| report)
            .ok_or_else(|| common::Error::report_not_found(service_id))
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
