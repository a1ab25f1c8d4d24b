//! Authoritative store of service instances.

use crate::aggregator::{ServiceMetadataSummary, summarize};
use crate::types::{ServiceInstance, ServiceRegistration};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeMap;
use std::time::SystemTime;
use tracing::{debug, info};

/// Result of a [`ServiceRegistry::register`] call.
#[derive(Debug, Clone)]
pub struct Registered {
    /// The stored record
    pub instance: ServiceInstance,

    /// The record it replaced, if the id was already known
    pub previous: Option<ServiceInstance>,
}

impl Registered {
    /// The id was previously deregistered and is now active again.
    pub fn is_revival(&self) -> bool {
        self.previous.as_ref().is_some_and(|p| !p.is_active())
    }
}

/// Instance table keyed by service id.
///
/// Every mutation holds only the lock of the shard that owns the id, so
/// snapshots are consistent per instance while registrations and probes
/// proceed concurrently.
#[derive(Default)]
pub struct ServiceRegistry {
    instances: DashMap<String, ServiceInstance>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an instance (last write wins).
    ///
    /// Re-registering keeps the original `registered_at` and clears any
    /// deregistration timestamp.
    pub fn register(&self, registration: ServiceRegistration) -> common::Result<Registered> {
        registration.validate()?;
        let now = SystemTime::now();

        let build = |registered_at| ServiceInstance {
            service_id: registration.service_id.clone(),
            service_name: registration.service_name.clone(),
            address: registration.address.clone(),
            port: registration.port,
            protocol: registration.protocol,
            metadata: registration.metadata.clone(),
            registered_at,
            deregistered_at: None,
        };

        let result = match self.instances.entry(registration.service_id.clone()) {
            Entry::Occupied(mut entry) => {
                let instance = build(entry.get().registered_at);
                let previous = entry.insert(instance.clone());
                Registered {
                    instance,
                    previous: Some(previous),
                }
            }
            Entry::Vacant(entry) => {
                let instance = build(now);
                entry.insert(instance.clone());
                Registered {
                    instance,
                    previous: None,
                }
            }
        };

        info!(
            service_id = %result.instance.service_id,
            service_name = %result.instance.service_name,
            address = %result.instance.address,
            port = result.instance.port,
            protocol = %result.instance.protocol,
            replaced = result.previous.is_some(),
            "Registered service instance"
        );

        Ok(result)
    }

    /// Mark an instance deregistered. The record is retained for reporting.
    ///
    /// Deregistering twice keeps the first timestamp.
    pub fn deregister(&self, service_id: &str) -> common::Result<ServiceInstance> {
        let mut entry = self
            .instances
            .get_mut(service_id)
            .ok_or_else(|| common::Error::instance_not_found(service_id))?;

        if entry.deregistered_at.is_none() {
            entry.deregistered_at = Some(SystemTime::now());
            info!(
                service_id,
                service_name = %entry.service_name,
                "Deregistered service instance"
            );
        }

        Ok(entry.clone())
    }

    /// Merge metadata into an instance. Health state is not touched.
    pub fn update_metadata<K, V>(
        &self,
        service_id: &str,
        updates: impl IntoIterator<Item = (K, V)>,
    ) -> common::Result<ServiceInstance>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut entry = self
            .instances
            .get_mut(service_id)
            .ok_or_else(|| common::Error::instance_not_found(service_id))?;

        entry.metadata.merge(updates);
        debug!(service_id, keys = entry.metadata.len(), "Updated instance metadata");

        Ok(entry.clone())
    }

    pub fn get(&self, service_id: &str) -> common::Result<ServiceInstance> {
        self.instances
            .get(service_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| common::Error::instance_not_found(service_id))
    }

    pub fn is_active(&self, service_id: &str) -> bool {
        self.instances
            .get(service_id)
            .is_some_and(|entry| entry.is_active())
    }

    fn snapshot(&self, keep: impl Fn(&ServiceInstance) -> bool) -> Vec<ServiceInstance> {
        let mut instances: Vec<ServiceInstance> = self
            .instances
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        instances.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        instances
    }

    /// Copies of every active instance, ordered by service id.
    pub fn list_active(&self) -> Vec<ServiceInstance> {
        self.snapshot(ServiceInstance::is_active)
    }

    /// Every instance of one service, deregistered ones included.
    ///
    /// The name is compared case-insensitively.
    pub fn list_by_service_name(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.snapshot(|instance| instance.matches_service(service_name))
    }

    /// Distinct names of services with at least one active instance.
    pub fn service_names(&self) -> Vec<String> {
        let mut names = BTreeMap::new();
        for instance in self.list_active() {
            names
                .entry(instance.service_name.to_lowercase())
                .or_insert(instance.service_name);
        }
        names.into_values().collect()
    }

    /// Metadata summary for one service
    pub fn metadata_summary(&self, service_name: &str) -> ServiceMetadataSummary {
        summarize(service_name, &self.list_by_service_name(service_name))
    }

    /// Forget a deregistered instance entirely.
    ///
    /// Active records are left alone, so a concurrent re-registration is
    /// never lost. Returns the removed record.
    pub fn purge_deregistered(&self, service_id: &str) -> Option<ServiceInstance> {
        let (_, instance) = self
            .instances
            .remove_if(service_id, |_, instance| !instance.is_active())?;
        info!(service_id, "Purged service instance");
        Some(instance)
    }

    /// Total tracked records, deregistered ones included
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.instances.iter().filter(|entry| entry.is_active()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe::ProbeProtocol;

    fn registration(id: &str, name: &str, port: u16) -> ServiceRegistration {
        ServiceRegistration::new(id, name, "10.0.0.1", port, ProbeProtocol::Http)
    }

    #[test]
    fn test_register_and_get() {
        let registry = ServiceRegistry::new();
        let result = registry.register(registration("orders-1", "orders", 8080)).unwrap();
        assert!(result.previous.is_none());
        assert!(!result.is_revival());

        let instance = registry.get("orders-1").unwrap();
        assert_eq!(instance.port, 8080);
        assert!(instance.is_active());
        assert!(registry.get("ORDERS-1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_register_rejects_invalid() {
        let registry = ServiceRegistry::new();
        assert!(registry.register(registration("", "orders", 8080)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let registry = ServiceRegistry::new();
        let first = registry.register(registration("orders-1", "orders", 8080)).unwrap();
        let second = registry.register(registration("orders-1", "orders", 9090)).unwrap();

        assert_eq!(second.previous.unwrap().port, 8080);
        assert_eq!(second.instance.registered_at, first.instance.registered_at);
        assert_eq!(registry.get("orders-1").unwrap().port, 9090);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deregister_retains_record() {
        let registry = ServiceRegistry::new();
        registry.register(registration("orders-1", "orders", 8080)).unwrap();

        let instance = registry.deregister("orders-1").unwrap();
        let stamp = instance.deregistered_at.unwrap();
        assert!(!registry.is_active("orders-1"));
        assert!(registry.list_active().is_empty());
        assert_eq!(registry.len(), 1);

        // Idempotent
        let again = registry.deregister("orders-1").unwrap();
        assert_eq!(again.deregistered_at, Some(stamp));

        assert!(registry.deregister("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reregister_after_deregister_revives() {
        let registry = ServiceRegistry::new();
        registry.register(registration("orders-1", "orders", 8080)).unwrap();
        registry.deregister("orders-1").unwrap();

        let result = registry.register(registration("orders-1", "orders", 8081)).unwrap();
        assert!(result.is_revival());
        assert!(registry.is_active("orders-1"));
        assert_eq!(registry.get("orders-1").unwrap().deregistered_at, None);
    }

    #[test]
    fn test_update_metadata_merges() {
        let registry = ServiceRegistry::new();
        registry
            .register(registration("orders-1", "orders", 8080).with_metadata("version", "1.0"))
            .unwrap();

        let instance = registry
            .update_metadata("orders-1", [("Version", "1.1"), ("zone", "b")])
            .unwrap();
        assert_eq!(instance.metadata.get("version"), Some("1.1"));
        assert_eq!(instance.metadata.get("zone"), Some("b"));

        let err = registry
            .update_metadata("missing", [("a", "b")])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_by_service_name_is_case_insensitive() {
        let registry = ServiceRegistry::new();
        registry.register(registration("orders-1", "Orders", 8080)).unwrap();
        registry.register(registration("orders-2", "orders", 8080)).unwrap();
        registry.register(registration("billing-1", "billing", 8080)).unwrap();
        registry.deregister("orders-2").unwrap();

        let orders = registry.list_by_service_name("ORDERS");
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].service_id, "orders-1");
        assert!(orders[0].is_active());
        assert!(!orders[1].is_active());

        assert_eq!(registry.service_names(), vec!["billing", "Orders"]);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_purge_deregistered() {
        let registry = ServiceRegistry::new();
        registry.register(registration("orders-1", "orders", 8080)).unwrap();

        // Active records survive
        assert!(registry.purge_deregistered("orders-1").is_none());
        assert!(registry.is_active("orders-1"));

        registry.deregister("orders-1").unwrap();
        let purged = registry.purge_deregistered("orders-1").unwrap();
        assert_eq!(purged.service_id, "orders-1");
        assert!(registry.is_empty());
        assert!(registry.purge_deregistered("orders-1").is_none());
    }
}
