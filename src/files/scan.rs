use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SorterError};
use crate::state::data::path_key;

/// Extensions recognized as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Check if a path looks like an image by its extension
pub fn is_image_path(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Check that a user-supplied folder names an existing directory
pub fn validate_folder(folder: &Path) -> Result<PathBuf> {
    let display = folder.to_string_lossy();
    if display.trim().is_empty() || !folder.is_dir() {
        return Err(SorterError::InvalidFolder(display.to_string()));
    }
    Ok(folder.to_path_buf())
}

/// List the image files directly inside `folder`, in enumeration order.
///
/// Subdirectories are not descended into. Paths that collide case-insensitively
/// with an earlier one are dropped.
pub fn scan_images(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| SorterError::Scan {
            path: folder.to_path_buf(),
            source,
        })?;

        // Only process files (not directories)
        if !entry.file_type().is_file() && !entry.path().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_image_path(path) {
            continue;
        }

        if seen.insert(path_key(path)) {
            images.push(path.to_path_buf());
        }
    }

    Ok(images)
}
