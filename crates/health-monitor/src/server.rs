//! Main health monitor server implementation.

use crate::control_plane::ControlPlane;
use crate::http_server::ApiServer;
use crate::metrics::MetricsRegistry;
use crate::scheduler::ProbeScheduler;
use crate::types::MonitorConfig;
use probe::{NetworkProber, Prober};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Health monitor server
pub struct HealthMonitorServer {
    config: MonitorConfig,
    control: Arc<ControlPlane>,
    prober: Arc<dyn Prober>,
}

impl HealthMonitorServer {
    /// Create a server probing over the network
    pub fn new(config: MonitorConfig) -> common::Result<Self> {
        let prober = NetworkProber::new(config.http_timeout, config.tcp_timeout, &config.http_headers)?;
        Ok(Self::with_prober(config, Arc::new(prober)))
    }

    /// Create a server with a custom prober
    pub fn with_prober(config: MonitorConfig, prober: Arc<dyn Prober>) -> Self {
        let metrics = if config.metrics_enabled {
            info!("Metrics enabled on {}/metrics", config.listen_addr);
            Some(Arc::new(MetricsRegistry::new()))
        } else {
            info!("Metrics disabled");
            None
        };

        let control = Arc::new(ControlPlane::new(config.thresholds, metrics));
        Self {
            config,
            control,
            prober,
        }
    }

    /// Shared handle to the registry, tracker and cache
    pub fn control_plane(&self) -> Arc<ControlPlane> {
        self.control.clone()
    }

    /// Run until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run on `listener` until `shutdown` resolves.
    ///
    /// The scheduler stops issuing probes and the API drains before this
    /// returns.
    pub async fn run_until(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), BoxError> {
        info!(
            listen_addr = %self.config.listen_addr,
            probe_interval_secs = self.config.probe_interval.as_secs(),
            failure_threshold = self.config.thresholds.failure,
            recovery_threshold = self.config.thresholds.recovery,
            max_concurrent_probes = self.config.max_concurrent_probes,
            "Starting health monitor"
        );

        let cancel = CancellationToken::new();

        let scheduler = ProbeScheduler::new(
            self.control.clone(),
            self.prober,
            self.config.probe_interval,
            self.config.max_concurrent_probes,
        );
        let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown.await;
            info!("Shutdown requested");
            signal_cancel.cancel();
        });

        let api = ApiServer::new(self.control);
        let served = api.serve(listener, cancel.clone()).await;

        // The API may also stop on its own (listener error)
        cancel.cancel();
        if let Err(e) = scheduler_handle.await {
            warn!(error = %e, "Scheduler task failed");
        }

        served?;
        info!("Health monitor stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
