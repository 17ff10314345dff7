//! Engine configuration
//!
//! Everything tunable in one serde-friendly struct: heuristic vote weights,
//! the change threshold, and the size of the worker pool used for parallel
//! summarization. Every field has a default, so `{}` is a valid config.

use crate::heuristics::{HeuristicWeights, DEFAULT_SCORE_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Tunable parameters of the analytics engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Vote weight per heuristic
    #[serde(default)]
    pub weights: HeuristicWeights,

    /// Accumulated score at which an output counts as change
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Worker threads for the parallel summary fold; never unbounded
    #[serde(default = "default_workers")]
    pub workers: usize,
}

// === Default value helpers ===

fn default_threshold() -> u32 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_workers() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: HeuristicWeights::default(),
            threshold: default_threshold(),
            workers: default_workers(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from its JSON form
    pub fn from_json(json: &str) -> crate::errors::AnalyticsResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::errors::AnalyticsError::InvalidInput(format!("malformed engine config: {e}"))
        })
    }
}
