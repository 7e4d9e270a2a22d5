//! gtbl - sprite-atlas resolution with deduplicated lazy bundle loading.
//!
//! A logical image path resolves to one of:
//! - an inline image registered by the caller,
//! - an item inside a gzip or JSON bundle listed by a manifest,
//! - the path itself, handed through as a standalone file.

mod defaults;
pub mod error;

pub mod atlas;
pub mod bundle;
pub mod config;
pub mod source;

pub use error::{Error, Result};

pub use atlas::{AtlasManager, EntryOrigin, ImageSink, ResolutionCache, ResolvedImage};
pub use bundle::codec::{self, CodecError};
pub use bundle::{
    manifest_base, BundleContents, BundleFormat, BundleId, BundleLoadState, Manifest, PathIndex,
};
pub use config::AtlasConfig;
pub use source::{AssetSource, FetchFuture, FileSource, HttpSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
