//! Configuration for the hybrid entities module

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hybrid entities configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Page size used when the caller does not send one
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound for requested page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Reject dynamic values whose keys are not declared by the schema
    #[serde(default = "default_true")]
    pub strict_dynamic_fields: bool,

    /// Maximum serialized dynamic payload size in bytes
    #[serde(default = "default_max_payload")]
    pub max_dynamic_payload_bytes: usize,

    /// Lookup tables backing select fields with a `dataSource`
    #[serde(default)]
    pub lookups: BTreeMap<String, Vec<LookupEntry>>,
}

/// One option of a configured lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupEntry {
    pub value: serde_json::Value,
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            strict_dynamic_fields: true,
            max_dynamic_payload_bytes: default_max_payload(),
            lookups: BTreeMap::new(),
        }
    }
}

fn default_page_size() -> u64 {
    10
}

fn default_max_page_size() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_max_payload() -> usize {
    1024 * 1024 // 1MB
}
