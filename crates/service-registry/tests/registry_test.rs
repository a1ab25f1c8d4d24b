//! Concurrency tests for the service registry

use probe::ProbeProtocol;
use service_registry::{ServiceRegistration, ServiceRegistry};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations() {
    let registry = Arc::new(ServiceRegistry::new());
    let mut handles = Vec::new();

    for worker in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..100 {
                let id = format!("svc-{}-{}", worker, i);
                registry
                    .register(ServiceRegistration::new(
                        id,
                        format!("service-{}", worker),
                        "10.0.0.1",
                        8000 + i,
                        ProbeProtocol::Tcp,
                    ))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.len(), 800);
    assert_eq!(registry.service_names().len(), 8);
    assert_eq!(registry.list_by_service_name("SERVICE-3").len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_metadata_updates_are_not_lost() {
    let registry = Arc::new(ServiceRegistry::new());
    registry
        .register(ServiceRegistration::new("shared", "shared", "10.0.0.1", 80, ProbeProtocol::Http))
        .unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                registry
                    .update_metadata("shared", [(format!("k{}-{}", worker, i), "v")])
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let instance = registry.get("shared").unwrap();
    assert_eq!(instance.metadata.len(), 400);

    let summary = registry.metadata_summary("shared");
    assert_eq!(summary.keys.len(), 400);
    assert!(summary.keys.iter().all(|k| k.instance_count == 1));
}

#[test]
fn test_instance_json_shape() {
    let registry = ServiceRegistry::new();
    let registered = registry
        .register(
            ServiceRegistration::new("a", "orders", "10.0.0.1", 80, ProbeProtocol::Tcp)
                .with_metadata("tcp_port", "81"),
        )
        .unwrap();

    let json = serde_json::to_value(&registered.instance).unwrap();
    assert_eq!(json["service_id"], "a");
    assert_eq!(json["protocol"], "tcp");
    assert_eq!(json["metadata"]["tcp_port"], "81");
    assert!(json["registered_at"].is_string());
    assert!(json["deregistered_at"].is_null());
}
