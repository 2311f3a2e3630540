/// Tag shortcuts
///
/// Digits 1-9 bind to destination folders. Pressing a bound digit tags the
/// current image; the collection only sees the result in the entry's tag slot.

use std::path::{Path, PathBuf};

use super::data::{ImageEntry, TagDefinition, TagRef};

/// Keys that can carry a tag, in display order
pub const TAG_KEYS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Resolves an input key to a tag and applies it to an entry
pub trait TagShortcuts {
    /// Tag `entry` with whatever `key` is bound to.
    ///
    /// Returns false (and leaves the entry alone) when the key is not bound
    /// to a tag with a destination.
    fn apply(&self, key: &str, entry: &mut ImageEntry) -> bool;
}

/// In-memory table of tag definitions, one per key
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: Vec<TagRef>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is one of the tag keys
    pub fn is_tag_key(key: &str) -> bool {
        TAG_KEYS.contains(&key)
    }

    /// Point `key` at `folder`.
    ///
    /// An existing definition is re-targeted in place, so images already
    /// carrying it follow the new folder.
    pub fn bind(&mut self, key: &str, folder: impl Into<PathBuf>) -> TagRef {
        let folder = folder.into();
        if let Some(tag) = self.get(key) {
            tag.set_target_folder(Some(folder));
            return tag;
        }

        let tag = TagRef::new(TagDefinition::new(key, folder));
        self.tags.push(tag.clone());
        tag
    }

    pub fn get(&self, key: &str) -> Option<TagRef> {
        self.tags
            .iter()
            .find(|tag| tag.key().as_deref() == Some(key))
            .cloned()
    }

    /// Destination currently bound to `key`
    pub fn target_of(&self, key: &str) -> Option<PathBuf> {
        self.get(key).and_then(|tag| tag.target_folder())
    }

    /// Whether pressing `key` would tag something right now
    pub fn is_bound(&self, key: &str) -> bool {
        self.target_of(key).is_some()
    }

    /// Remove the tag from an entry. Returns whether it had one.
    pub fn clear(&self, entry: &mut ImageEntry) -> bool {
        entry.tag.take().is_some()
    }

    /// (key, folder) pairs for every bound key, in key order
    pub fn bindings(&self) -> Vec<(String, PathBuf)> {
        TAG_KEYS
            .iter()
            .filter_map(|key| self.target_of(key).map(|folder| (key.to_string(), folder)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl TagShortcuts for TagRegistry {
    fn apply(&self, key: &str, entry: &mut ImageEntry) -> bool {
        match self.get(key) {
            Some(tag) if tag.target_folder().is_some() => {
                entry.tag = Some(tag);
                true
            }
            _ => false,
        }
    }
}

/// Short label for a folder, e.g. "keepers" for /photos/keepers
pub fn folder_label(folder: &Path) -> String {
    folder
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| folder.display().to_string())
}
