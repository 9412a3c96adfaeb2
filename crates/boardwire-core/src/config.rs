//! Document configuration.

use crate::error::DocResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of undo steps kept by the undo manager.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 100;
/// Default window (ms) in which consecutive local edits merge into one undo step.
pub const DEFAULT_UNDO_MERGE_INTERVAL_MS: i64 = 300;

/// Settings applied when a [`BoardDocument`](crate::BoardDocument) is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Maximum undo steps retained for local changes.
    pub max_undo_steps: usize,
    /// Edits closer together than this are merged into one undo step.
    pub undo_merge_interval_ms: i64,
    /// Fixed replica peer id. `None` lets the substrate pick a random one.
    pub peer_id: Option<u64>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            undo_merge_interval_ms: DEFAULT_UNDO_MERGE_INTERVAL_MS,
            peer_id: None,
        }
    }
}

impl DocumentConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> DocResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> DocResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> DocResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
