//! Registry record types.

use crate::metadata::Metadata;
use probe::{ProbeProtocol, ProbeTarget};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A registration request as submitted by a service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    /// Unique, case-sensitive instance identifier
    pub service_id: String,

    /// Logical service this instance belongs to
    pub service_name: String,

    pub address: String,
    pub port: u16,

    #[serde(default)]
    pub protocol: ProbeProtocol,

    #[serde(default)]
    pub metadata: Metadata,
}

impl ServiceRegistration {
    pub fn new(
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        protocol: ProbeProtocol,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            address: address.into(),
            port,
            protocol,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Reject registrations that could never be probed or looked up.
    pub fn validate(&self) -> common::Result<()> {
        if self.service_id.trim().is_empty() {
            return Err(common::Error::invalid("service_id must not be empty"));
        }
        if self.service_name.trim().is_empty() {
            return Err(common::Error::invalid("service_name must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(common::Error::invalid("address must not be empty"));
        }
        if self.port == 0 {
            return Err(common::Error::invalid("port must be in 1..=65535"));
        }
        Ok(())
    }
}

/// A tracked service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service_id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub protocol: ProbeProtocol,
    pub metadata: Metadata,

    #[serde(with = "humantime_serde")]
    pub registered_at: SystemTime,

    /// Set once the instance has been deregistered
    #[serde(default, with = "humantime_serde")]
    pub deregistered_at: Option<SystemTime>,
}

impl ServiceInstance {
    pub fn is_active(&self) -> bool {
        self.deregistered_at.is_none()
    }

    pub fn matches_service(&self, service_name: &str) -> bool {
        self.service_name.to_lowercase() == service_name.to_lowercase()
    }

    /// Resolve where and how this instance should be probed.
    pub fn probe_target(&self) -> ProbeTarget {
        ProbeTarget::from_instance(
            &self.service_id,
            &self.address,
            self.port,
            self.protocol,
            |key| self.metadata.get(key),
        )
    }
}
