/// Filesystem access module
///
/// This module handles:
/// - Listing image files in a folder (scan.rs)
/// - Conflict-free renaming and moving of files (relocate.rs)
/// - Watching the open folder for new files (watcher.rs)

pub mod scan;
pub mod relocate;
pub mod watcher;
