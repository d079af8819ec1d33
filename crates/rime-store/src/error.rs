use std::fmt;

use rime_core::SnapshotError;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    /// Snapshot is malformed or violates the schema.
    Format(String),
    Config(String),
    Csv(csv::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Format(msg) => write!(f, "invalid snapshot: {msg}"),
            StoreError::Config(msg) => write!(f, "invalid config: {msg}"),
            StoreError::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e)
    }
}

impl From<SnapshotError> for StoreError {
    fn from(e: SnapshotError) -> Self {
        StoreError::Format(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
