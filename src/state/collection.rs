use std::path::{Path, PathBuf};

use super::data::{path_key, ImageEntry, Thumbnail};
use crate::error::Result;
use crate::files::relocate::{move_file, resolve_destination};
use crate::files::scan::{is_image_path, scan_images, validate_folder};
use crate::files::watcher::{FolderWatcher, WatchEvent};

pub const STATUS_INVALID_FOLDER: &str = "Invalid folder";
pub const STATUS_LOADING: &str = "Loading…";

/// Thumbnails requested on each side of the cursor by default
pub const DEFAULT_PREFETCH_RADIUS: usize = 2;

/// Outcome of a tag-based batch move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveReport {
    pub moved: usize,
    /// Source missing, tag without a destination, or already in place
    pub skipped: usize,
    pub failed: usize,
}

/// The ImageCollection is the single owner of "what images are in this folder".
///
/// All mutation goes through `&mut self`, so whoever holds the collection is
/// the owning context. The folder watcher never touches it directly: its
/// thread posts events into a channel and the owner applies them with
/// [`ImageCollection::process_watch_events`].
///
/// Selection is an `Option<usize>`: `None` exactly when there are no entries.
pub struct ImageCollection {
    folder_path: Option<PathBuf>,
    entries: Vec<ImageEntry>,
    selected: Option<usize>,
    status: String,
    busy: bool,
    watcher: Option<FolderWatcher>,
    /// Paths whose thumbnail should be decoded, drained by the owner
    thumbnail_queue: Vec<PathBuf>,
    prefetch_radius: usize,
}

impl Default for ImageCollection {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_RADIUS)
    }
}

impl ImageCollection {
    /// Create an empty collection with no folder open
    pub fn new(prefetch_radius: usize) -> Self {
        ImageCollection {
            folder_path: None,
            entries: Vec::new(),
            selected: None,
            status: String::from("Ready. Open a folder to start."),
            busy: false,
            watcher: None,
            thumbnail_queue: Vec::new(),
            prefetch_radius,
        }
    }

    // ========== Loading ==========

    /// Replace the collection with the images found directly in `folder`.
    ///
    /// Never fails: an invalid folder or a listing error ends up in
    /// [`status`](Self::status). An invalid folder leaves the current
    /// entries untouched.
    pub fn load(&mut self, folder: impl AsRef<Path>) {
        self.load_with(folder, scan_images);
    }

    /// [`load`](Self::load) with the directory listing supplied by `scan`
    fn load_with(
        &mut self,
        folder: impl AsRef<Path>,
        scan: impl FnOnce(&Path) -> Result<Vec<PathBuf>>,
    ) {
        let folder = match validate_folder(folder.as_ref()) {
            Ok(folder) => folder,
            Err(e) => {
                tracing::warn!("{}", e);
                self.status = STATUS_INVALID_FOLDER.to_string();
                return;
            }
        };

        self.stop_watching();
        self.busy = true;
        self.status = STATUS_LOADING.to_string();
        self.folder_path = Some(folder.clone());

        tracing::info!("🔍 Scanning folder: {}", folder.display());

        // busy is cleared on every path out of here
        let result = self.populate(&folder, scan);
        self.busy = false;

        match result {
            Ok(count) => {
                self.status = image_count(count);
                self.start_watching(&folder);
                self.queue_visible_thumbnails();
                tracing::info!("✅ Loaded {} images from {}", count, folder.display());
            }
            Err(e) => {
                tracing::warn!("⚠️  {}", e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    /// Clear, then fill from a fresh listing
    fn populate(
        &mut self,
        folder: &Path,
        scan: impl FnOnce(&Path) -> Result<Vec<PathBuf>>,
    ) -> Result<usize> {
        self.entries.clear();
        self.thumbnail_queue.clear();
        self.selected = None;

        let paths = scan(folder)?;
        self.entries.extend(paths.into_iter().map(ImageEntry::new));
        self.selected = if self.entries.is_empty() { None } else { Some(0) };

        Ok(self.entries.len())
    }

    // ========== Watcher integration ==========

    fn start_watching(&mut self, folder: &Path) {
        // Live updates are a convenience; without them the list still works
        match FolderWatcher::start(folder) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => tracing::warn!("Live updates disabled for {}: {}", folder.display(), e),
        }
    }

    fn stop_watching(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            tracing::debug!("Stopped watching {}", watcher.folder().display());
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Apply every event the watcher has posted since the last call.
    ///
    /// Returns the number of entries added.
    pub fn process_watch_events(&mut self) -> usize {
        let events = match &self.watcher {
            Some(watcher) => watcher.drain(),
            None => return 0,
        };

        let mut added = 0;
        for event in events {
            if self.handle_watch_event(event) {
                added += 1;
            }
        }
        added
    }

    /// Apply one watcher event on the owning context.
    ///
    /// Events may be stale, duplicated, or out of order; anything that does
    /// not describe a new image file that still exists is ignored. Returns
    /// true when an entry was added.
    pub fn handle_watch_event(&mut self, event: WatchEvent) -> bool {
        let path = match event {
            WatchEvent::Created(path) | WatchEvent::Renamed(path) => path,
            WatchEvent::Failed(reason) => {
                tracing::warn!("Watcher error: {}", reason);
                self.status = format!("Watcher error: {}", reason);
                return false;
            }
        };

        if !is_image_path(&path) || self.contains(&path) {
            return false;
        }
        // The file may be gone again by the time we get here
        if !path.is_file() {
            tracing::debug!("Ignoring vanished file {}", path.display());
            return false;
        }

        tracing::debug!("➕ New image {}", path.display());
        self.entries.push(ImageEntry::new(path));
        self.revalidate_selection();

        let added = self.entries.len() - 1;
        self.queue_thumbnail(added);
        self.queue_visible_thumbnails();

        self.status = image_count(self.entries.len());
        true
    }

    // ========== Navigation ==========

    pub fn move_next(&mut self) {
        if let Some(index) = self.selected {
            self.selected = Some((index + 1).min(self.entries.len() - 1));
            self.queue_visible_thumbnails();
        }
    }

    pub fn move_previous(&mut self) {
        if let Some(index) = self.selected {
            self.selected = Some(index.saturating_sub(1));
            self.queue_visible_thumbnails();
        }
    }

    /// Jump straight to an entry, clamped to the list
    pub fn select(&mut self, index: usize) {
        if self.entries.is_empty() {
            return;
        }
        self.selected = Some(index.min(self.entries.len() - 1));
        self.queue_visible_thumbnails();
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_image(&self) -> Option<&ImageEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    /// Mutable access for the tag resolver, which only writes the tag slot
    pub fn selected_image_mut(&mut self) -> Option<&mut ImageEntry> {
        self.selected.and_then(|i| self.entries.get_mut(i))
    }

    pub fn previous_image(&self) -> Option<&ImageEntry> {
        self.selected
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.entries.get(i))
    }

    pub fn next_image(&self) -> Option<&ImageEntry> {
        self.selected.and_then(|i| self.entries.get(i + 1))
    }

    /// Keep the cursor inside the list after any change to it
    fn revalidate_selection(&mut self) {
        self.selected = match (self.entries.len(), self.selected) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(index)) => Some(index.min(len - 1)),
        };
    }

    // ========== Batch move ==========

    /// Move every tagged image into its tag's folder.
    ///
    /// Works on a snapshot of the tagged entries taken up front. Each file
    /// succeeds or fails on its own; a failure is written to the status and
    /// the batch carries on. Moved entries keep their place in the list with
    /// their new path. Files already sitting in their tag's folder are
    /// skipped, so running the batch again moves nothing twice.
    pub fn move_images_by_tag(&mut self) -> MoveReport {
        let snapshot: Vec<(usize, PathBuf, Option<PathBuf>)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let tag = entry.tag.as_ref()?;
                Some((index, entry.file_path().to_path_buf(), tag.target_folder()))
            })
            .collect();

        let mut report = MoveReport::default();
        if snapshot.is_empty() {
            self.status = String::from("No tagged images to move");
            return report;
        }

        let mut last_error = None;
        for (index, source, target_folder) in snapshot {
            if !source.is_file() {
                tracing::debug!("Skipping {}: file is gone", source.display());
                report.skipped += 1;
                continue;
            }
            let Some(target_folder) = target_folder else {
                tracing::debug!("Skipping {}: tag has no destination", source.display());
                report.skipped += 1;
                continue;
            };
            if is_inside(&source, &target_folder) {
                tracing::debug!("Skipping {}: already in its tag folder", source.display());
                report.skipped += 1;
                continue;
            }

            let destination = resolve_destination(&source, &target_folder);
            match move_file(&source, &destination) {
                Ok(()) => {
                    tracing::info!("📦 {} -> {}", source.display(), destination.display());
                    if let Some(entry) = self.entries.get_mut(index) {
                        entry.set_file_path(destination);
                    }
                    report.moved += 1;
                }
                Err(e) => {
                    tracing::warn!("⚠️  {}", e);
                    self.status = e.to_string();
                    last_error = Some(e);
                    report.failed += 1;
                }
            }
        }

        if last_error.is_none() {
            self.status = match report.skipped {
                0 => format!("Moved {}", image_count(report.moved)),
                skipped => format!("Moved {}, skipped {}", image_count(report.moved), skipped),
            };
        }

        // Moving reset in-flight decodes, ask again under the new paths
        self.queue_visible_thumbnails();

        tracing::info!(
            "📊 Move summary: {} moved, {} skipped, {} failed",
            report.moved,
            report.skipped,
            report.failed
        );

        report
    }

    /// Whether an entry's file now lives outside the open folder
    pub fn is_relocated(&self, entry: &ImageEntry) -> bool {
        match &self.folder_path {
            Some(folder) => entry.file_path().parent() != Some(folder.as_path()),
            None => false,
        }
    }

    // ========== Thumbnails ==========

    fn queue_thumbnail(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            if entry.begin_thumbnail() {
                self.thumbnail_queue.push(entry.file_path().to_path_buf());
            }
        }
    }

    /// Request thumbnails for the cursor and its neighbours
    fn queue_visible_thumbnails(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        let start = index.saturating_sub(self.prefetch_radius);
        let end = (index + self.prefetch_radius).min(self.entries.len() - 1);
        for i in start..=end {
            self.queue_thumbnail(i);
        }
    }

    /// Hand the pending thumbnail requests to the caller
    pub fn take_thumbnail_requests(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.thumbnail_queue)
    }

    /// Deliver a decode result. Results for paths no longer in the list are
    /// dropped.
    pub fn apply_thumbnail(&mut self, path: &Path, thumbnail: Option<Thumbnail>) {
        let key = path_key(path);
        match self.entries.iter_mut().find(|entry| entry.key() == key) {
            Some(entry) => entry.finish_thumbnail(thumbnail),
            None => tracing::debug!("Dropping thumbnail for {}", path.display()),
        }
    }

    // ========== Accessors ==========

    pub fn contains(&self, path: &Path) -> bool {
        let key = path_key(path);
        self.entries.iter().any(|entry| entry.key() == key)
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tagged_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.has_tag()).count()
    }

    pub fn folder_path(&self) -> Option<&Path> {
        self.folder_path.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Distinct keys, used to check the no-duplicates invariant
    #[cfg(test)]
    fn unique_keys(&self) -> usize {
        self.entries
            .iter()
            .map(ImageEntry::key)
            .collect::<std::collections::HashSet<_>>()
            .len()
    }
}

/// "1 image" / "N images"
fn image_count(count: usize) -> String {
    match count {
        1 => String::from("1 image"),
        n => format!("{} images", n),
    }
}

/// Whether `path` sits directly in `folder`, ignoring case
fn is_inside(path: &Path, folder: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| parent == folder || path_key(parent) == path_key(folder))
}

impl std::fmt::Debug for ImageCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCollection")
            .field("folder_path", &self.folder_path)
            .field("entries", &self.entries.len())
            .field("selected", &self.selected)
            .field("status", &self.status)
            .field("busy", &self.busy)
            .field("watcher", &self.watcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SorterError;
    use crate::state::data::{TagDefinition, TagRef, ThumbnailState};
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    fn folder_with(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    fn names(collection: &ImageCollection) -> Vec<String> {
        let mut names: Vec<String> = collection.entries().iter().map(ImageEntry::file_name).collect();
        names.sort();
        names
    }

    fn assert_selection_valid(collection: &ImageCollection) {
        match collection.selected_index() {
            None => assert!(collection.is_empty()),
            Some(i) => assert!(i < collection.len()),
        }
    }

    fn tag_to(folder: &Path) -> TagRef {
        TagRef::new(TagDefinition::new("1", folder))
    }

    #[test]
    fn test_new_collection_is_empty() {
        let collection = ImageCollection::default();
        assert!(collection.is_empty());
        assert_eq!(collection.selected_index(), None);
        assert!(collection.selected_image().is_none());
        assert!(!collection.is_busy());
        assert!(collection.folder_path().is_none());
    }

    #[test]
    fn test_load_filters_by_extension() {
        let dir = folder_with(&["a.jpg", "b.txt", "c.PNG"]);
        let mut collection = ImageCollection::default();

        collection.load(dir.path());

        assert_eq!(names(&collection), vec!["a.jpg", "c.PNG"]);
        assert_eq!(collection.selected_index(), Some(0));
        assert_eq!(collection.status(), "2 images");
        assert_eq!(collection.folder_path(), Some(dir.path()));
        assert!(!collection.is_busy());
    }

    #[test]
    fn test_load_twice_does_not_duplicate() {
        let dir = folder_with(&["a.jpg", "b.gif"]);
        let mut collection = ImageCollection::default();

        collection.load(dir.path());
        collection.load(dir.path());

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.unique_keys(), 2);
    }

    #[test]
    fn test_load_invalid_folder_keeps_entries() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        collection.load("");
        assert_eq!(collection.status(), STATUS_INVALID_FOLDER);
        assert_eq!(collection.len(), 1);

        collection.load("   ");
        collection.load(dir.path().join("does-not-exist"));
        collection.load(dir.path().join("a.jpg"));
        assert_eq!(collection.status(), STATUS_INVALID_FOLDER);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.folder_path(), Some(dir.path()));
        assert_selection_valid(&collection);
    }

    #[test]
    fn test_load_empty_folder() {
        let dir = folder_with(&["notes.txt"]);
        let mut collection = ImageCollection::default();

        collection.load(dir.path());

        assert!(collection.is_empty());
        assert_eq!(collection.selected_index(), None);
        assert_eq!(collection.status(), "0 images");
    }

    #[test]
    fn test_load_replaces_previous_folder() {
        let first = folder_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let second = folder_with(&["z.png"]);
        let mut collection = ImageCollection::default();

        collection.load(first.path());
        collection.move_next();
        collection.move_next();
        collection.load(second.path());

        assert_eq!(names(&collection), vec!["z.png"]);
        assert_eq!(collection.selected_index(), Some(0));
    }

    #[test]
    fn test_load_listing_error_goes_to_status() {
        let first = folder_with(&["a.jpg", "b.jpg"]);
        let second = folder_with(&["c.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(first.path());
        assert_eq!(collection.len(), 2);

        collection.load_with(second.path(), |_| {
            Err(SorterError::Io(io::Error::new(io::ErrorKind::Other, "disk unplugged")))
        });

        assert!(collection.status().starts_with("Error:"));
        assert!(collection.status().contains("disk unplugged"));
        assert!(!collection.is_busy());
        assert!(collection.is_empty());
        assert_eq!(collection.selected_index(), None);
        assert!(!collection.is_watching());
        assert!(collection.take_thumbnail_requests().is_empty());
    }

    #[test]
    fn test_navigation_clamps_at_both_ends() {
        let dir = folder_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        collection.move_previous();
        collection.move_previous();
        assert_eq!(collection.selected_index(), Some(0));

        for _ in 0..5 {
            collection.move_next();
            assert_selection_valid(&collection);
        }
        assert_eq!(collection.selected_index(), Some(2));

        collection.move_previous();
        assert_eq!(collection.selected_index(), Some(1));
    }

    #[test]
    fn test_navigation_on_empty_is_noop() {
        let mut collection = ImageCollection::default();
        collection.move_next();
        collection.move_previous();
        collection.select(4);
        assert_eq!(collection.selected_index(), None);
    }

    #[test]
    fn test_select_clamps() {
        let dir = folder_with(&["a.jpg", "b.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        collection.select(10);
        assert_eq!(collection.selected_index(), Some(1));
    }

    #[test]
    fn test_derived_images_follow_cursor() {
        let dir = folder_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        assert!(collection.previous_image().is_none());
        let second = collection.entries()[1].file_path().to_path_buf();
        assert_eq!(collection.next_image().unwrap().file_path(), second);

        collection.move_next();
        assert_eq!(
            collection.previous_image().unwrap().file_path(),
            collection.entries()[0].file_path()
        );
        assert_eq!(collection.selected_image().unwrap().file_path(), second);

        collection.move_next();
        assert!(collection.next_image().is_none());
    }

    #[test]
    fn test_watch_event_adds_image() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());
        assert!(collection.next_image().is_none());

        let new_path = dir.path().join("b.webp");
        fs::write(&new_path, b"x").unwrap();

        assert!(collection.handle_watch_event(WatchEvent::Created(new_path.clone())));

        // Cursor did not move, but "next" now exists
        assert_eq!(collection.selected_index(), Some(0));
        assert_eq!(collection.next_image().unwrap().file_path(), new_path);
        assert_eq!(collection.status(), "2 images");
        assert!(collection.take_thumbnail_requests().contains(&new_path));
    }

    #[test]
    fn test_watch_event_into_empty_collection_selects_first() {
        let dir = folder_with(&[]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());
        assert_eq!(collection.selected_index(), None);

        let path = dir.path().join("first.jpg");
        fs::write(&path, b"x").unwrap();
        collection.handle_watch_event(WatchEvent::Renamed(path));

        assert_eq!(collection.selected_index(), Some(0));
        assert_eq!(collection.status(), "1 image");
    }

    #[test]
    fn test_watch_event_for_known_path_is_noop() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        let known = dir.path().join("a.jpg");
        let shouted = PathBuf::from(known.to_string_lossy().to_uppercase());

        assert!(!collection.handle_watch_event(WatchEvent::Created(known.clone())));
        assert!(!collection.handle_watch_event(WatchEvent::Renamed(known)));
        assert!(!collection.handle_watch_event(WatchEvent::Created(shouted)));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_watch_event_for_deleted_path_is_noop() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        let ghost = dir.path().join("ghost.jpg");
        fs::write(&ghost, b"x").unwrap();
        fs::remove_file(&ghost).unwrap();

        assert!(!collection.handle_watch_event(WatchEvent::Created(ghost)));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_watch_event_for_non_image_is_noop() {
        let dir = folder_with(&["a.jpg", "b.txt"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        assert!(!collection.handle_watch_event(WatchEvent::Created(dir.path().join("b.txt"))));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_watch_failure_goes_to_status() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());

        collection.handle_watch_event(WatchEvent::Failed("overflow".into()));

        assert!(collection.status().contains("overflow"));
        assert_eq!(collection.len(), 1);
        assert_selection_valid(&collection);
    }

    #[test]
    fn test_batch_move_partial_failure() {
        let source = folder_with(&["x.jpg", "y.jpg", "z.jpg"]);
        let f1 = TempDir::new().unwrap();
        let f2_missing = f1.path().join("not-created");

        let mut collection = ImageCollection::default();
        collection.load(source.path());
        let index_of = |c: &ImageCollection, name: &str| {
            c.entries().iter().position(|e| e.file_name() == name).unwrap()
        };

        let (x, z) = (index_of(&collection, "x.jpg"), index_of(&collection, "z.jpg"));
        collection.select(x);
        collection.selected_image_mut().unwrap().tag = Some(tag_to(f1.path()));
        collection.select(z);
        collection.selected_image_mut().unwrap().tag = Some(tag_to(&f2_missing));

        let report = collection.move_images_by_tag();

        assert_eq!(report, MoveReport { moved: 1, skipped: 0, failed: 1 });
        assert!(f1.path().join("x.jpg").is_file());
        assert!(source.path().join("y.jpg").is_file());
        assert!(source.path().join("z.jpg").is_file());
        assert!(collection.status().contains("z.jpg"));

        let y = index_of(&collection, "y.jpg");
        assert_eq!(collection.entries()[y].file_path(), source.path().join("y.jpg"));
        let x = index_of(&collection, "x.jpg");
        assert_eq!(collection.entries()[x].file_path(), f1.path().join("x.jpg"));
    }

    #[test]
    fn test_batch_move_keeps_entries_and_renames_conflicts() {
        let source = folder_with(&["photo.jpg"]);
        let target = folder_with(&["photo.jpg", "photo(1).jpg"]);

        let mut collection = ImageCollection::default();
        collection.load(source.path());
        collection.selected_image_mut().unwrap().tag = Some(tag_to(target.path()));

        let report = collection.move_images_by_tag();

        assert_eq!(report.moved, 1);
        assert_eq!(collection.len(), 1);
        let moved = collection.selected_image().unwrap();
        assert_eq!(moved.file_path(), target.path().join("photo(2).jpg"));
        assert!(collection.is_relocated(moved));
        assert_eq!(fs::read(target.path().join("photo(2).jpg")).unwrap(), b"photo.jpg");
        assert_eq!(collection.status(), "Moved 1 image");
    }

    #[test]
    fn test_batch_move_skips_missing_source_and_unset_target() {
        let source = folder_with(&["gone.jpg", "aimless.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(source.path());

        let no_target = TagRef::new(TagDefinition {
            key: Some("2".into()),
            target_folder: None,
        });
        let target = TempDir::new().unwrap();
        for i in 0..collection.len() {
            collection.select(i);
            let entry = collection.selected_image_mut().unwrap();
            entry.tag = Some(if entry.file_name() == "gone.jpg" {
                tag_to(target.path())
            } else {
                no_target.clone()
            });
        }
        fs::remove_file(source.path().join("gone.jpg")).unwrap();

        let report = collection.move_images_by_tag();

        assert_eq!(report, MoveReport { moved: 0, skipped: 2, failed: 0 });
        assert!(source.path().join("aimless.jpg").is_file());
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_batch_move_without_tags() {
        let source = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(source.path());

        let report = collection.move_images_by_tag();

        assert_eq!(report, MoveReport::default());
        assert!(source.path().join("a.jpg").is_file());
        assert_eq!(collection.tagged_count(), 0);
    }

    #[test]
    fn test_batch_move_twice_leaves_sorted_files_alone() {
        let source = folder_with(&["x.jpg"]);
        let target = TempDir::new().unwrap();
        let mut collection = ImageCollection::default();
        collection.load(source.path());
        collection.selected_image_mut().unwrap().tag = Some(tag_to(target.path()));

        let first = collection.move_images_by_tag();
        let second = collection.move_images_by_tag();
        collection.move_images_by_tag();

        assert_eq!(first, MoveReport { moved: 1, skipped: 0, failed: 0 });
        assert_eq!(second, MoveReport { moved: 0, skipped: 1, failed: 0 });
        assert_eq!(
            collection.selected_image().unwrap().file_path(),
            target.path().join("x.jpg")
        );
        let in_target: Vec<_> = fs::read_dir(target.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(in_target, vec![std::ffi::OsString::from("x.jpg")]);
        assert_eq!(collection.status(), "Moved 0 images, skipped 1");
    }

    #[test]
    fn test_batch_move_into_open_folder_is_skipped() {
        let source = folder_with(&["x.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(source.path());
        collection.selected_image_mut().unwrap().tag = Some(tag_to(source.path()));

        let report = collection.move_images_by_tag();

        assert_eq!(report, MoveReport { moved: 0, skipped: 1, failed: 0 });
        assert!(source.path().join("x.jpg").is_file());
        assert!(!source.path().join("x(1).jpg").exists());
        assert_eq!(
            collection.selected_image().unwrap().file_path(),
            source.path().join("x.jpg")
        );
    }

    #[test]
    fn test_batch_move_requests_thumbnail_for_new_path() {
        let source = folder_with(&["x.jpg"]);
        let target = TempDir::new().unwrap();
        let mut collection = ImageCollection::default();
        collection.load(source.path());
        // Decode is in flight for the old path
        assert_eq!(collection.take_thumbnail_requests(), vec![source.path().join("x.jpg")]);
        collection.selected_image_mut().unwrap().tag = Some(tag_to(target.path()));

        collection.move_images_by_tag();

        let moved = target.path().join("x.jpg");
        assert_eq!(collection.take_thumbnail_requests(), vec![moved.clone()]);
        assert_eq!(collection.selected_image().unwrap().thumbnail(), &ThumbnailState::Pending);

        // The late result for the old path is dropped, the new one lands
        collection.apply_thumbnail(&source.path().join("x.jpg"), None);
        assert_eq!(collection.selected_image().unwrap().thumbnail(), &ThumbnailState::Pending);
    }

    #[test]
    fn test_thumbnails_are_requested_lazily() {
        let dir = folder_with(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
        let mut collection = ImageCollection::new(1);
        collection.load(dir.path());

        // Cursor at 0, radius 1: entries 0 and 1
        assert_eq!(collection.take_thumbnail_requests().len(), 2);
        assert!(collection.take_thumbnail_requests().is_empty());

        collection.move_next();
        // Entry 2 comes into range, 0 and 1 are already pending
        assert_eq!(collection.take_thumbnail_requests().len(), 1);
    }

    #[test]
    fn test_apply_thumbnail_matches_case_insensitively() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());
        let requested = collection.take_thumbnail_requests();
        assert_eq!(requested.len(), 1);

        let thumb = Thumbnail {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        };
        let shouted = PathBuf::from(requested[0].to_string_lossy().to_uppercase());
        collection.apply_thumbnail(&shouted, Some(thumb.clone()));
        collection.apply_thumbnail(Path::new("/elsewhere/a.jpg"), None);

        assert_eq!(
            collection.selected_image().unwrap().thumbnail(),
            &ThumbnailState::Ready(thumb)
        );
    }

    #[test]
    fn test_selection_invariant_through_mixed_operations() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        assert_selection_valid(&collection);

        collection.load(dir.path());
        assert_selection_valid(&collection);

        for name in ["b.png", "c.bmp"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").unwrap();
            collection.handle_watch_event(WatchEvent::Created(path));
            collection.move_next();
            assert_selection_valid(&collection);
        }
        assert_eq!(collection.selected_index(), Some(2));

        let empty = folder_with(&[]);
        collection.load(empty.path());
        assert_selection_valid(&collection);
        assert_eq!(collection.selected_index(), None);
    }

    #[test]
    fn test_process_watch_events_picks_up_new_file() {
        let dir = folder_with(&["a.jpg"]);
        let mut collection = ImageCollection::default();
        collection.load(dir.path());
        if !collection.is_watching() {
            return;
        }

        fs::write(dir.path().join("late.png"), b"x").unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while collection.len() < 2 && std::time::Instant::now() < deadline {
            collection.process_watch_events();
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.unique_keys(), 2);
    }
}
