use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rime_core::{EngineConfig, FrameManager, export_json, import_json};

use crate::error::{Result, StoreError};

/// File name used when only a data directory is configured.
pub const DEFAULT_SNAPSHOT_FILE: &str = "rime_state.json";

/// Whole-state JSON snapshot at an explicit path.
///
/// Saves overwrite the file in one write; there is no rename-into-place, so
/// a crash mid-write can leave a truncated snapshot behind.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `dir/rime_state.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the saved manager. A missing file is a fresh start, not an error.
    pub fn load(&self, config: EngineConfig) -> Result<FrameManager> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("no snapshot at {}, starting fresh", self.path.display());
                return Ok(FrameManager::new(config));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mgr = import_json(&json, config)?;
        tracing::info!(
            "loaded snapshot {}: tick={}, processed={}, frames={}",
            self.path.display(),
            mgr.tick,
            mgr.processed_index,
            mgr.frames.len()
        );
        Ok(mgr)
    }

    /// Write the full manager state, creating parent directories as needed.
    pub fn save(&self, mgr: &FrameManager) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = export_json(mgr)
            .map_err(|e| StoreError::Format(format!("snapshot export failed: {e}")))?;
        fs::write(&self.path, json)?;
        tracing::info!(
            "saved snapshot {}: tick={}, frames={}, events={}",
            self.path.display(),
            mgr.tick,
            mgr.frames.len(),
            mgr.event_log.len()
        );
        Ok(())
    }
}
