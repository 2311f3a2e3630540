/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the collection, the tag registry and the UI layer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Decoded preview pixels (RGBA8, row-major)
#[derive(Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Where an entry's thumbnail is in its lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThumbnailState {
    /// Not decoded yet, or decoding failed
    #[default]
    Absent,
    /// A decode has been requested and not answered
    Pending,
    Ready(Thumbnail),
}

/// A user-defined (key, destination folder) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDefinition {
    /// Input key identifier (e.g. "1"); None means no binding
    pub key: Option<String>,
    /// Absolute destination folder; None means "not configured yet"
    pub target_folder: Option<PathBuf>,
}

impl TagDefinition {
    pub fn new(key: impl Into<String>, target_folder: impl Into<PathBuf>) -> Self {
        Self {
            key: Some(key.into()),
            target_folder: Some(target_folder.into()),
        }
    }
}

/// Shared handle to a [`TagDefinition`].
///
/// The registry owns the definitions; entries only hold clones of the handle,
/// so re-targeting a tag is visible through every entry that carries it.
#[derive(Clone, Default)]
pub struct TagRef(Arc<RwLock<TagDefinition>>);

impl TagRef {
    pub fn new(definition: TagDefinition) -> Self {
        Self(Arc::new(RwLock::new(definition)))
    }

    pub fn key(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).key.clone()
    }

    pub fn target_folder(&self) -> Option<PathBuf> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .target_folder
            .clone()
    }

    pub fn set_key(&self, key: Option<String>) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).key = key;
    }

    pub fn set_target_folder(&self, folder: Option<PathBuf>) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).target_folder = folder;
    }

    /// Two handles are the same tag when they share the definition
    pub fn same_tag(&self, other: &TagRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definition = self.0.read().unwrap_or_else(PoisonError::into_inner);
        fmt::Debug::fmt(&*definition, f)
    }
}

/// Represents a single image file tracked by the collection
#[derive(Debug, Clone)]
pub struct ImageEntry {
    file_path: PathBuf,
    thumbnail: ThumbnailState,
    /// Tag slot, written by the tag resolver
    pub tag: Option<TagRef>,
}

impl ImageEntry {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            thumbnail: ThumbnailState::Absent,
            tag: None,
        }
    }

    /// Full path to the image file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Filename only (e.g., "DSC_0001.jpg")
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Case-insensitive identity used for de-duplication
    pub fn key(&self) -> String {
        path_key(&self.file_path)
    }

    pub fn thumbnail(&self) -> &ThumbnailState {
        &self.thumbnail
    }

    pub fn has_tag(&self) -> bool {
        self.tag.is_some()
    }

    /// Only the collection relocates files, so only it rewrites the path.
    ///
    /// A decode still in flight was requested for the old path and will be
    /// dropped on arrival, so the entry goes back to needing one.
    pub(crate) fn set_file_path(&mut self, file_path: PathBuf) {
        self.file_path = file_path;
        if self.thumbnail == ThumbnailState::Pending {
            self.thumbnail = ThumbnailState::Absent;
        }
    }

    /// Mark a decode as in flight. Returns false when nothing needs requesting.
    pub(crate) fn begin_thumbnail(&mut self) -> bool {
        match self.thumbnail {
            ThumbnailState::Absent => {
                self.thumbnail = ThumbnailState::Pending;
                true
            }
            ThumbnailState::Pending | ThumbnailState::Ready(_) => false,
        }
    }

    /// Apply a decode result. A ready thumbnail is never replaced or cleared.
    pub(crate) fn finish_thumbnail(&mut self, thumbnail: Option<Thumbnail>) {
        if matches!(self.thumbnail, ThumbnailState::Ready(_)) {
            return;
        }
        self.thumbnail = match thumbnail {
            Some(thumbnail) => ThumbnailState::Ready(thumbnail),
            None => ThumbnailState::Absent,
        };
    }
}

/// Lowercased path string; two paths with the same key are the same image
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
