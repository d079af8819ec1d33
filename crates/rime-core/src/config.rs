//! Engine parameters. Every field has a default, so partial config files
//! deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ADAPT_THRESHOLD, DECAY_BASE, DECAY_SCALE, MERGE_THRESHOLD, PRUNE_MIN_SCORE,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Contradiction count that triggers adaptation in newly created frames.
    pub frame_threshold: usize,
    /// Jaccard similarity at or above which frames merge.
    pub merge_threshold: f64,
    pub prune: PruneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_threshold: ADAPT_THRESHOLD,
            merge_threshold: MERGE_THRESHOLD,
            prune: PruneConfig::default(),
        }
    }
}

/// Staleness rule: a frame is pruned when `score <= min_score` and it has
/// been inactive for more than `base + |axioms| * scale` ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    pub base: u64,
    pub scale: u64,
    pub min_score: i64,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            base: DECAY_BASE,
            scale: DECAY_SCALE,
            min_score: PRUNE_MIN_SCORE,
        }
    }
}
