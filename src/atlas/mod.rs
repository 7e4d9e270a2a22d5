//! Runtime image resolution.
//!
//! This module provides:
//! - The resolution cache and resolved image type (`cache`)
//! - Per-bundle dedup queues (`loader`)
//! - The `AtlasManager` entry point (`manager`)

pub mod cache;
pub mod loader;
pub mod manager;

pub use cache::{EntryOrigin, ResolutionCache, ResolvedImage};
pub use loader::ImageSink;
pub use manager::AtlasManager;
