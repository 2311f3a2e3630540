/// Image preview module
///
/// This module handles:
/// - Decoding thumbnails off the UI thread
/// - Resizing them for the previous/next strip

pub mod thumbnail;
