use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("a clock named '{0}' already exists")]
    DuplicateName(String),

    #[error("timezone '{0}' could not be resolved")]
    UnresolvedTimezone(String),

    #[error("timezone '{0}' is not in the catalog")]
    UnsupportedTimezone(String),

    #[error("persisted value under '{key}' is malformed: {reason}")]
    PersistDataCorrupt { key: String, reason: String },

    #[error("external lookup failed: {0}")]
    ExternalFetch(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("storage file {} is not accessible: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ClockResult<T> = Result<T, ClockError>;
