use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rime_core::EngineConfig;

use crate::error::{Result, StoreError};

/// Config file looked up in the data directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "rime.toml";

/// Load engine parameters from a TOML file.
///
/// A missing file yields the defaults, as do missing keys:
///
/// ```toml
/// frame_threshold = 3
/// merge_threshold = 0.8
///
/// [prune]
/// base = 50
/// scale = 2
/// min_score = -5
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(EngineConfig::default());
        }
        Err(e) => return Err(StoreError::Io(e)),
    };

    let config = parse_config(&content)
        .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
    tracing::debug!("loaded config {}: {config:?}", path.display());
    Ok(config)
}

fn parse_config(content: &str) -> std::result::Result<EngineConfig, String> {
    let config: EngineConfig = toml::from_str(content).map_err(|e| e.to_string())?;
    if !(0.0..=1.0).contains(&config.merge_threshold) {
        return Err(format!(
            "merge_threshold must be within [0, 1], got {}",
            config.merge_threshold
        ));
    }
    Ok(config)
}
