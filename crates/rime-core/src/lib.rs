//! RIME (Recursive Integrative Meaning Engine) belief-frame engine.
//!
//! A population of frames competes to explain a stream of tokens. Each
//! frame accepts tokens it already holds as axioms, logs the rest as
//! contradictions, and adapts by promoting repeated contradictions. The
//! manager elects the best-scoring frame each tick, spawns frames for
//! tokens nobody accepts, merges near-duplicates and prunes stale losers,
//! logging every transition.
//!
//! Zero I/O: snapshots go in and out as JSON strings.

pub mod config;
pub mod constants;
pub mod event;
pub mod frame;
pub mod manager;
pub mod merge;
pub mod prune;
pub mod registry;
pub mod serde_compat;

pub use config::{EngineConfig, PruneConfig};
pub use constants::{
    ADAPT_THRESHOLD, DECAY_BASE, DECAY_SCALE, MERGE_THRESHOLD, PRUNE_MIN_SCORE, TRUST_DEFAULT,
};
pub use event::ManagerEvent;
pub use frame::{Adaptation, Contradiction, Frame, FrameEvent, Token, new_frame_id};
pub use manager::{FrameManager, Summary};
pub use merge::{combine, jaccard};
pub use prune::is_decayed;
pub use registry::FrameRegistry;
pub use serde_compat::{SnapshotError, export_json, import_json};
