/// Error types for the image sorter
///
/// Every fallible helper returns [`Result`]. The collection turns these into
/// status messages at its public boundary, so no error ever reaches the UI as
/// a panic.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SorterError {
    /// The requested folder is empty, missing, or not a directory
    #[error("Invalid folder: {0}")]
    InvalidFolder(String),

    /// Listing the folder failed part way through
    #[error("Failed to read {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A single file could not be relocated
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The filesystem watcher could not be created or reported an error
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// settings.json exists but could not be parsed
    #[error("Invalid settings in {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SorterError>;
