//! Per-service metadata summaries.

use crate::types::ServiceInstance;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::SystemTime;

/// Summary of one metadata key across a service's instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataKeySummary {
    pub key: String,

    /// Number of instances carrying this key
    pub instance_count: usize,

    /// Distinct values, compared case-insensitively, in first-seen order
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadataSummary {
    pub service_name: String,
    pub instance_count: usize,

    #[serde(with = "humantime_serde")]
    pub generated_at: SystemTime,

    /// Ordered by key, case-insensitively
    pub keys: Vec<MetadataKeySummary>,
}

struct KeyAccumulator {
    key: String,
    instance_count: usize,
    values: Vec<String>,
    seen: HashSet<String>,
}

/// Summarize the metadata of `instances` under `service_name`.
///
/// An empty slice yields a summary with zero instances and no keys.
pub fn summarize(service_name: &str, instances: &[ServiceInstance]) -> ServiceMetadataSummary {
    let mut keys: BTreeMap<String, KeyAccumulator> = BTreeMap::new();

    for instance in instances {
        for (key, value) in instance.metadata.iter() {
            let acc = keys
                .entry(key.to_lowercase())
                .or_insert_with(|| KeyAccumulator {
                    key: key.to_string(),
                    instance_count: 0,
                    values: Vec::new(),
                    seen: HashSet::new(),
                });
            acc.instance_count += 1;
            if acc.seen.insert(value.to_lowercase()) {
                acc.values.push(value.to_string());
            }
        }
    }

    ServiceMetadataSummary {
        service_name: instances
            .first()
            .map(|instance| instance.service_name.clone())
            .unwrap_or_else(|| service_name.to_string()),
        instance_count: instances.len(),
        generated_at: SystemTime::now(),
        keys: keys
            .into_values()
            .map(|acc| MetadataKeySummary {
                key: acc.key,
                instance_count: acc.instance_count,
                values: acc.values,
            })
            .collect(),
    }
}
