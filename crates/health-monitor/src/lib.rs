//! Mesh health monitor
//!
//! Actively probes every registered service instance and publishes a
//! hysteresis-smoothed health status per instance for routing consumers.
//!
//! # Architecture
//!
//! - **Control plane**: the service registry, per-instance health state and
//!   the report cache behind one handle
//! - **Scheduler**: periodic probe cycles over a bounded worker pool
//! - **HTTP API**: status queries, registration and discovery, `/metrics`
//!
//! Probe failures never surface as API errors: an unreachable instance is
//! reported as `Unhealthy` with the failure message.

pub mod cache;
pub mod config;
pub mod control_plane;
pub mod http_server;
pub mod metrics;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub mod types;

pub use cache::HealthReportCache;
pub use config::{Config, ConfigError};
pub use control_plane::{AppliedOutcome, ControlPlane};
pub use http_server::{ApiServer, ApiState, build_router};
pub use metrics::MetricsRegistry;
pub use scheduler::ProbeScheduler;
pub use server::HealthMonitorServer;
pub use telemetry::{TelemetryGuard, setup_tracing};
pub use types::{CycleSummary, HealthReport, MonitorConfig};
