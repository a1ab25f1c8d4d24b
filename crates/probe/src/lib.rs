//! Probe execution and health state tracking for mesh service instances.
//!
//! This crate provides the two leaves of the health monitor:
//! - **Probe executors**: one HTTP or TCP attempt against an instance with a
//!   timeout, every failure folded into a [`ProbeOutcome`]
//! - **Health state machine**: dual-threshold hysteresis turning a stream of
//!   outcomes into `Unknown` / `Healthy` / `Unhealthy` transitions
//!
//! # Example
//!
//! ```no_run
//! use probe::{HealthTracker, NetworkProber, Prober, ProbeProtocol, ProbeTarget, Thresholds};
//! use std::time::Duration;
//!
//! # async fn example() -> common::Result<()> {
//! let prober = NetworkProber::new(Duration::from_secs(5), Duration::from_secs(3), &[])?;
//! let tracker = HealthTracker::new(Thresholds::new(3, 2)?);
//!
//! let target = ProbeTarget::from_instance("orders-1", "10.0.0.5", 8080, ProbeProtocol::Http, |_| None);
//! let outcome = prober.probe(&target).await;
//! let (state, transition) = tracker.record(&target.service_id, &outcome, target.protocol);
//! println!("{} {:?}", state.status, transition);
//! # Ok(())
//! # }
//! ```

pub mod checkers;
pub mod hysteresis;
pub mod tracker;
pub mod types;

pub use checkers::{HttpProber, NetworkProber, Prober, TcpProber, parse_http_headers};
pub use hysteresis::{InstanceHealthState, Thresholds, Transition, advance};
pub use tracker::HealthTracker;
pub use types::{HealthStatus, ProbeKind, ProbeOutcome, ProbeProtocol, ProbeTarget};
