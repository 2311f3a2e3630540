use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SorterError};

/// Find a free path for `desired`.
///
/// Returns `desired` itself when nothing is there, otherwise the first of
/// `name(1).ext`, `name(2).ext`, ... that does not exist.
pub fn ensure_unique(desired: &Path) -> PathBuf {
    if !desired.exists() {
        return desired.to_path_buf();
    }

    let parent = desired.parent().unwrap_or_else(|| Path::new(""));
    let stem = desired
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let extension = desired
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u32 = 1;
    loop {
        let candidate = parent.join(format!("{}({}){}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Destination for `source` inside `target_folder`, renamed if taken
pub fn resolve_destination(source: &Path, target_folder: &Path) -> PathBuf {
    let file_name = source.file_name().unwrap_or_default();
    ensure_unique(&target_folder.join(file_name))
}

/// Move a file, falling back to copy + delete when the destination is on
/// another filesystem
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(from, to, |path| fs::remove_file(path))
        }
        Err(source) => Err(SorterError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }),
    }
}

/// Copy `from` to `to`, then delete `from` with `remove_source`.
///
/// If either step fails the copy at `to` is deleted again, so a failed move
/// never leaves a second file behind.
fn copy_then_remove(
    from: &Path,
    to: &Path,
    remove_source: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<()> {
    let outcome = fs::copy(from, to).and_then(|_| remove_source(from));

    outcome.map_err(|source| {
        let _ = fs::remove_file(to);
        SorterError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    })
}
