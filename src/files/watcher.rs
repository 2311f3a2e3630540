/// Live updates for the open folder
///
/// notify delivers events on its own thread. That thread never touches the
/// collection: it filters out obvious noise and posts what is left into a
/// channel, which the owning context drains on its own schedule.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::Result;
use crate::files::scan::is_image_path;

/// A change worth looking at, as reported by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file appeared under this name
    Created(PathBuf),
    /// A file was renamed to this name (temp file -> final name)
    Renamed(PathBuf),
    /// The watcher reported an error; it stays armed
    Failed(String),
}

impl WatchEvent {
    /// The path a Created/Renamed event points at
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Created(path) | WatchEvent::Renamed(path) => Some(path),
            WatchEvent::Failed(_) => None,
        }
    }
}

/// Non-recursive watcher over a single folder.
///
/// Dropping it unsubscribes from the OS and discards any undelivered events.
pub struct FolderWatcher {
    folder: PathBuf,
    // Held for its Drop, which stops the OS subscription
    _watcher: RecommendedWatcher,
    events: Receiver<WatchEvent>,
}

impl FolderWatcher {
    /// Start watching `folder` for created and renamed files
    pub fn start(folder: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            forward(res, &tx);
        })?;
        watcher.watch(folder, RecursiveMode::NonRecursive)?;

        tracing::debug!("👀 Watching {}", folder.display());

        Ok(FolderWatcher {
            folder: folder.to_path_buf(),
            _watcher: watcher,
            events: rx,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Take every event posted so far without blocking
    pub fn drain(&self) -> Vec<WatchEvent> {
        self.events.try_iter().collect()
    }
}

impl std::fmt::Debug for FolderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderWatcher")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Runs on notify's thread: filter, then post and return immediately
fn forward(res: notify::Result<Event>, tx: &Sender<WatchEvent>) {
    let events = match res {
        Ok(event) => translate(&event),
        Err(e) => vec![WatchEvent::Failed(e.to_string())],
    };

    for event in events {
        if !worth_posting(&event) {
            continue;
        }
        // The receiver is gone once the watcher is being torn down
        if tx.send(event).is_err() {
            return;
        }
    }
}

/// Map a raw notify event onto the create/rename events we care about.
///
/// For renames only the destination matters.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(WatchEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).cloned().map(WatchEvent::Renamed).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        // To / Any / Other: some backends cannot tell the two halves apart
        EventKind::Modify(ModifyKind::Name(_)) => {
            event.paths.iter().cloned().map(WatchEvent::Renamed).collect()
        }
        _ => Vec::new(),
    }
}

/// Cheap checks that need no collection state: image extension, still on disk
fn worth_posting(event: &WatchEvent) -> bool {
    match event.path() {
        Some(path) => is_image_path(path) && path.is_file(),
        None => true,
    }
}
