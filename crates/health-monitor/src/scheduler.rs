//! Periodic probe scheduler.

use crate::control_plane::{AppliedOutcome, ControlPlane};
use crate::types::CycleSummary;
use probe::Prober;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives one probe per active instance every interval.
///
/// Probes of a cycle share a fixed-size worker pool; a cycle waits for all of
/// its probes before the next one starts, so results for one instance are
/// always applied in issue order.
pub struct ProbeScheduler {
    control: Arc<ControlPlane>,
    prober: Arc<dyn Prober>,
    pool: Arc<Semaphore>,
    pool_size: usize,
    interval: Duration,
}

impl ProbeScheduler {
    /// Create a new scheduler
    pub fn new(
        control: Arc<ControlPlane>,
        prober: Arc<dyn Prober>,
        interval: Duration,
        max_concurrent_probes: usize,
    ) -> Self {
        let pool_size = max_concurrent_probes.max(1);
        Self {
            control,
            prober,
            pool: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            interval,
        }
    }

    /// Run until `cancel` fires. The first cycle starts immediately.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            pool_size = self.pool_size,
            prober = self.prober.name(),
            "Probe scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let summary = self.run_cycle(&cancel).await;
            if summary.cancelled {
                break;
            }
        }

        info!("Probe scheduler stopped");
    }

    /// Probe every active instance once.
    ///
    /// Stops dispatching when `cancel` fires; probes already running are
    /// awaited (each is bounded by its own timeout).
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let started = Instant::now();
        let instances = self.control.registry().list_active();
        let mut summary = CycleSummary {
            instances: instances.len(),
            ..Default::default()
        };

        let mut in_flight = JoinSet::new();

        for instance in instances {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                permit = self.pool.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break, // pool closed
                },
            };

            let prober = self.prober.clone();
            let control = self.control.clone();
            summary.dispatched += 1;

            in_flight.spawn(async move {
                let _permit = permit;
                let target = instance.probe_target();
                let outcome = prober.probe(&target).await;
                debug!(
                    service_id = %instance.service_id,
                    target = %target.authority(),
                    kind = outcome.kind.as_str(),
                    latency_ms = outcome.latency.as_millis() as u64,
                    "Probe completed"
                );
                control.apply_outcome(&instance, &outcome)
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(Some(AppliedOutcome { transition, .. })) => {
                    summary.applied += 1;
                    if transition.is_some() {
                        summary.transitions += 1;
                    }
                }
                Ok(None) => summary.discarded += 1,
                Err(e) => warn!(error = %e, "Probe task failed"),
            }
        }

        summary.duration = started.elapsed();
        self.record(&summary);
        summary
    }

    fn record(&self, summary: &CycleSummary) {
        if let Some(m) = self.control.metrics() {
            m.record_cycle(summary);
            m.update_instance_count(self.control.registry().active_count());
            let (healthy, unhealthy, unknown) = self.control.tracker().counts_by_status();
            m.update_instances_by_status(healthy, unhealthy, unknown);
        }

        let duration_ms = summary.duration.as_millis() as u64;
        if summary.transitions > 0 || summary.cancelled {
            info!(
                instances = summary.instances,
                dispatched = summary.dispatched,
                discarded = summary.discarded,
                transitions = summary.transitions,
                cancelled = summary.cancelled,
                duration_ms,
                "Probe cycle finished"
            );
        } else {
            debug!(
                instances = summary.instances,
                dispatched = summary.dispatched,
                discarded = summary.discarded,
                duration_ms,
                "Probe cycle finished"
            );
        }
    }
}
