pub mod config;
pub mod error;
pub mod snapshot;
pub mod tabular;

pub use config::{DEFAULT_CONFIG_FILE, load_config};
pub use error::{Result, StoreError};
pub use snapshot::{DEFAULT_SNAPSHOT_FILE, SnapshotStore};
pub use tabular::{
    read_tokens, read_tokens_from, write_frame_events, write_frame_summary, write_manager_events,
    write_manager_summary,
};
