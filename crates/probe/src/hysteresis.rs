//! Dual-threshold hysteresis over probe outcomes.
//!
//! A run of `failure` consecutive failed probes flips an instance to
//! [`HealthStatus::Unhealthy`]; a run of `recovery` consecutive successes flips
//! it to [`HealthStatus::Healthy`]. The counter that completed a run is reset
//! when the transition fires, so each crossing fires exactly once. An isolated
//! outcome of the opposite polarity only resets the running counter.

use crate::types::{HealthStatus, ProbeOutcome, ProbeProtocol};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Hysteresis thresholds. Both must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Consecutive failures required to become unhealthy
    pub failure: u32,

    /// Consecutive successes required to become healthy
    pub recovery: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            failure: 3,
            recovery: 2,
        }
    }
}

impl Thresholds {
    pub fn new(failure: u32, recovery: u32) -> common::Result<Self> {
        if failure == 0 {
            return Err(common::Error::config("failure threshold must be at least 1"));
        }
        if recovery == 0 {
            return Err(common::Error::config("recovery threshold must be at least 1"));
        }
        Ok(Self { failure, recovery })
    }
}

/// Per-instance health record owned by the state machine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceHealthState {
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,

    #[serde(default, with = "humantime_serde")]
    pub last_probe_at: Option<SystemTime>,

    pub last_probe_type: Option<ProbeProtocol>,
    pub last_message: Option<String>,
}

/// A status change produced by one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

/// Compute the state that follows `current` after `outcome`.
///
/// Pure: the caller decides where the result is stored and must apply it
/// atomically per instance.
pub fn advance(
    current: &InstanceHealthState,
    outcome: &ProbeOutcome,
    protocol: ProbeProtocol,
    thresholds: Thresholds,
    now: SystemTime,
) -> (InstanceHealthState, Option<Transition>) {
    let mut next = current.clone();
    let mut transition = None;

    if outcome.success {
        next.consecutive_successes = next.consecutive_successes.saturating_add(1);
        next.consecutive_failures = 0;

        if next.status != HealthStatus::Healthy && next.consecutive_successes >= thresholds.recovery {
            transition = Some(Transition {
                from: next.status,
                to: HealthStatus::Healthy,
            });
            next.status = HealthStatus::Healthy;
            next.consecutive_successes = 0;
        }
    } else {
        next.consecutive_failures = next.consecutive_failures.saturating_add(1);
        next.consecutive_successes = 0;

        if next.status != HealthStatus::Unhealthy && next.consecutive_failures >= thresholds.failure {
            transition = Some(Transition {
                from: next.status,
                to: HealthStatus::Unhealthy,
            });
            next.status = HealthStatus::Unhealthy;
            next.consecutive_failures = 0;
        }
    }

    next.last_probe_at = Some(now);
    next.last_probe_type = Some(protocol);
    next.last_message = Some(outcome.message.clone());

    (next, transition)
}
