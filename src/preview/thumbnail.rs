use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::state::data::Thumbnail;

/// Default size of generated thumbnails (fits inside a square)
pub const THUMBNAIL_SIZE: u32 = 256;

/// Decode a thumbnail for `path` on the blocking pool.
///
/// Returns the path it was asked for together with the result, so the caller
/// can route it back to the right entry. Any failure yields `None`.
pub async fn load_thumbnail(path: PathBuf, size: u32) -> (PathBuf, Option<Thumbnail>) {
    let source = path.clone();

    // Spawn blocking because decoding and resizing are CPU-intensive
    let thumbnail = task::spawn_blocking(move || generate_thumbnail(&source, size))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Thumbnail task join error: {}", e);
            None
        });

    (path, thumbnail)
}

/// Decode and resize an image file into RGBA pixels
pub fn generate_thumbnail(path: &Path, size: u32) -> Option<Thumbnail> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!("❌ No thumbnail for {}: {}", path.display(), e);
            return None;
        }
    };

    // Resize to thumbnail size, keeping the aspect ratio
    let size = size.max(1);
    let rgba = img.resize(size, size, FilterType::Lanczos3).to_rgba8();

    Some(Thumbnail {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
