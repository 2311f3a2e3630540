/// User settings
///
/// Read once at startup from settings.json in the user's config directory:
/// - Linux: ~/.config/image-sorter/settings.json
/// - macOS: ~/Library/Application Support/image-sorter/settings.json
/// - Windows: %APPDATA%\image-sorter\settings.json
///
/// Every field is optional. Tags are never stored here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, SorterError};
use crate::preview::thumbnail::THUMBNAIL_SIZE;
use crate::state::collection::DEFAULT_PREFETCH_RADIUS;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Edge length of the square thumbnails fit into, in pixels
    pub thumbnail_size: u32,
    /// Thumbnails decoded on each side of the current image
    pub prefetch_radius: usize,
    /// How often new-file events are pulled from the watcher (ms)
    pub watch_poll_ms: u64,
    /// Folder opened at startup
    pub start_folder: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thumbnail_size: THUMBNAIL_SIZE,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            watch_poll_ms: 200,
            start_folder: None,
        }
    }
}

impl Settings {
    /// Location of settings.json, if the platform has a config directory
    pub fn path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("image-sorter");
        path.push("settings.json");
        Some(path)
    }

    /// Load the user's settings, falling back to defaults.
    ///
    /// A broken file is reported and ignored rather than stopping startup.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("⚠️  Using default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Read settings from `path`; a missing file means defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let settings = Self::from_json(&json).map_err(|source| SorterError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply command-line arguments: the first one is a folder to open
    pub fn with_args(mut self, mut args: impl Iterator<Item = String>) -> Self {
        if let Some(folder) = args.next() {
            self.start_folder = Some(PathBuf::from(folder));
        }
        self
    }
}
