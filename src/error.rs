//! Errors for the few fallible boundaries: reading configuration and
//! persisted state. The simulation itself normalizes bad input instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
