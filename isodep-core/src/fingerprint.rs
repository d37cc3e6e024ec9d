//! Configuration fingerprinting: deterministic identification of isolator
//! configurations.
//!
//! - `structure_hash()`: source names and modes only, ignoring radii,
//!   weights and vetoes. Groups configurations of the same shape.
//! - `fingerprint()`: the complete configuration, for exact identity. Written
//!   next to results so a value can be traced back to what produced it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::IsolatorConfig;

/// BLAKE3 hex digest identifying a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFingerprint(pub String);

impl ConfigFingerprint {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex characters, for log lines and file names.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IsolatorConfig {
    /// Structural hash: source names and modes, in order.
    ///
    /// Two configurations that differ only in cone radius produce the same
    /// `structure_hash` but different `fingerprint` values.
    pub fn structure_hash(&self) -> ConfigFingerprint {
        let structural = self
            .deposits
            .iter()
            .map(|d| format!("{}:{}", d.source, d.mode))
            .collect::<Vec<_>>()
            .join("+");
        ConfigFingerprint::from_bytes(structural.as_bytes())
    }

    /// Full hash of the canonical JSON serialization.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        // field order is fixed by the struct definitions
        let json = serde_json::to_string(self).expect("IsolatorConfig must serialize");
        ConfigFingerprint::from_bytes(json.as_bytes())
    }
}
