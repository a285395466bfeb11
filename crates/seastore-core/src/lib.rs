// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub mod config;

pub const CRATE_NAME: &str = "seastore-core";

pub const ENV_SEASTORE_STORES: &str = "SEASTORE_STORES";
pub const ENV_SEASTORE_LOG_JSON: &str = "SEASTORE_LOG_JSON";
pub const ENV_SEASTORE_MIN_DEPTH: &str = "SEASTORE_MIN_DEPTH";
pub const ENV_SEASTORE_MAX_DEPTH: &str = "SEASTORE_MAX_DEPTH";
pub const ENV_SEASTORE_TRACK_TOLERANCE: &str = "SEASTORE_TRACK_TOLERANCE";
pub const ENV_SEASTORE_DEPTH_TIME_TOLERANCE: &str = "SEASTORE_DEPTH_TIME_TOLERANCE";
pub const ENV_SEASTORE_PROGRESS_EVERY: &str = "SEASTORE_PROGRESS_EVERY";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Machine-readable error envelope shared by every crate in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl std::fmt::Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub mod canonical {
    use serde::Serialize;
    use serde_json::{Map, Value};

    /// Serializes `value` with object keys sorted at every depth.
    pub fn stable_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
        let raw = serde_json::to_value(value)?;
        serde_json::to_vec(&normalize_json_value(raw))
    }

    pub fn stable_json_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
        let raw = serde_json::to_value(value)?;
        serde_json::to_string(&normalize_json_value(raw))
    }

    pub fn stable_json_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
        let bytes = stable_json_bytes(value)?;
        Ok(super::sha256_hex(&bytes))
    }

    fn normalize_json_value(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<(String, Value)> = map
                    .into_iter()
                    .map(|(k, v)| (k, normalize_json_value(v)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                let mut sorted = Map::new();
                for (k, v) in entries {
                    sorted.insert(k, v);
                }
                Value::Object(sorted)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(normalize_json_value).collect())
            }
            other => other,
        }
    }
}
