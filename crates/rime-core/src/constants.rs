/// Trust assigned to a token the first time a frame sees it.
pub const TRUST_DEFAULT: f64 = 1.0;

/// Trust moved per evaluation, up on acceptance and down on rejection.
pub const TRUST_STEP: f64 = 0.1;

/// Trust floor.
pub const TRUST_MIN: f64 = 0.0;

/// Trust ceiling.
pub const TRUST_MAX: f64 = 1.0;

/// Contradictions a frame accumulates before it adapts.
pub const ADAPT_THRESHOLD: usize = 3;

/// Jaccard similarity at or above which two frames merge.
pub const MERGE_THRESHOLD: f64 = 0.8;

/// Prune: ticks of inactivity every frame is allowed regardless of size.
pub const DECAY_BASE: u64 = 50;

/// Prune: extra ticks of inactivity allowed per axiom.
pub const DECAY_SCALE: u64 = 2;

/// Prune: a frame must score at or below this to be a candidate.
pub const PRUNE_MIN_SCORE: i64 = -5;
