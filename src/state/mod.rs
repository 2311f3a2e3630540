/// State management module
///
/// This module handles all application state, including:
/// - The live image collection, navigation and batch moves (collection.rs)
/// - Shared data structures (data.rs)
/// - Tag definitions and key shortcuts (tags.rs)

pub mod collection;
pub mod data;
pub mod tags;
