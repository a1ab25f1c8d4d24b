//! Service registry for the mesh health control plane.
//!
//! Holds every known service instance keyed by its service id, retains
//! deregistered records for reporting, and summarizes instance metadata per
//! logical service.
//!
//! # Example
//!
//! ```
//! use probe::ProbeProtocol;
//! use service_registry::{ServiceRegistration, ServiceRegistry};
//!
//! let registry = ServiceRegistry::new();
//! registry
//!     .register(
//!         ServiceRegistration::new("orders-1", "orders", "10.0.0.1", 8080, ProbeProtocol::Http)
//!             .with_metadata("version", "1.4.2"),
//!     )
//!     .unwrap();
//!
//! let summary = registry.metadata_summary("Orders");
//! assert_eq!(summary.instance_count, 1);
//! ```

pub mod aggregator;
pub mod metadata;
pub mod registry;
pub mod types;

pub use aggregator::{MetadataKeySummary, ServiceMetadataSummary, summarize};
pub use metadata::Metadata;
pub use registry::{Registered, ServiceRegistry};
pub use types::{ServiceInstance, ServiceRegistration};
