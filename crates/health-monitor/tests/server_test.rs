//! End-to-end test of the server lifecycle: scheduler, API and shutdown

use async_trait::async_trait;
use health_monitor::{HealthMonitorServer, MonitorConfig};
use probe::{HealthStatus, ProbeOutcome, ProbeProtocol, ProbeTarget, Prober, Thresholds};
use service_registry::ServiceRegistration;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[derive(Default)]
struct AlwaysHealthy {
    probes: AtomicUsize,
}

#[async_trait]
impl Prober for AlwaysHealthy {
    async fn probe(&self, _target: &ProbeTarget) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        ProbeOutcome::success(Duration::from_millis(1), "HTTP 200").with_status_code(200)
    }

    fn name(&self) -> &str {
        "always-healthy"
    }
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_server_probes_serves_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = MonitorConfig {
        listen_addr: addr,
        probe_interval: Duration::from_millis(20),
        thresholds: Thresholds::new(1, 1).unwrap(),
        ..Default::default()
    };
    let prober = Arc::new(AlwaysHealthy::default());
    let server = HealthMonitorServer::with_prober(config, prober.clone());
    let control = server.control_plane();

    control
        .register(ServiceRegistration::new(
            "orders-1",
            "orders",
            "127.0.0.1",
            9000,
            ProbeProtocol::Http,
        ))
        .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(listener, async move {
        let _ = shutdown_rx.await;
    }));

    // Wait for the scheduler to publish a report
    let mut healthy = false;
    for _ in 0..100 {
        if control
            .cache()
            .get("orders-1")
            .is_ok_and(|r| r.status == HealthStatus::Healthy)
        {
            healthy = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(healthy, "instance never became healthy");

    let response = http_get(addr, "/status/orders").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"Healthy""#));

    let response = http_get(addr, "/metrics").await;
    assert!(response.contains("mesh_health_probe_cycles_total"));

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());

    // No probes after shutdown
    let probes = prober.probes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(prober.probes.load(Ordering::SeqCst), probes);
}
