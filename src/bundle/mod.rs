//! Bundle identity and on-disk formats.
//!
//! This module provides:
//! - The bundle wire codec (`codec`)
//! - The manifest-driven path index (`index`)

pub mod codec;
pub mod index;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults;

pub use codec::BundleContents;
pub use index::{manifest_base, Manifest, PathIndex};

/// Wire variant of a bundle document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleFormat {
    /// Gzip-compressed JSON (`.gtbl`)
    Gzip,
    /// Plain JSON (`.json`)
    Json,
}

impl BundleFormat {
    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gzip => defaults::GZIP_BUNDLE_EXT,
            Self::Json => defaults::JSON_BUNDLE_EXT,
        }
    }
}

/// Identifier of a bundle document; also its fetch location.
///
/// Built as `{manifest base}/{group}{bundle extension}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(String);

impl BundleId {
    pub fn new(base: &str, group: &str, format: BundleFormat) -> Self {
        Self(format!("{}/{}{}", base, group, format.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix under which the bundle's items are addressed: the id minus its extension.
    pub fn item_base(&self) -> &str {
        strip_extension(&self.0)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Load state machine for a single bundle.
///
/// IDLE -> LOADING -> RESOLVED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleLoadState {
    /// Never requested
    Idle,
    /// Fetch outstanding, waiters queued
    Loading,
    /// Decoded and committed to the cache
    Resolved,
    /// Fetch or decode failed; waiters got direct references
    Failed,
}

impl fmt::Display for BundleLoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Loading => write!(f, "LOADING"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Strip the extension of the last path segment, if it has one.
pub(crate) fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}
