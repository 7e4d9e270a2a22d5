//! Resolution cache: logical path -> resolved image.
//!
//! Load-once. Entries are never evicted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Final displayable source for a logical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedImage {
    /// `data:` URI carrying the pixels
    Inline(String),
    /// Path handed through to be loaded as a standalone file
    External(String),
}

impl ResolvedImage {
    /// Wrap a bundle payload into an inline image.
    ///
    /// Payloads that are already data URIs are kept verbatim.
    pub fn from_payload(payload: &str, mime: &str) -> Self {
        if payload.starts_with(defaults::DATA_URI_SCHEME) {
            Self::Inline(payload.to_string())
        } else {
            Self::Inline(format!("data:{};base64,{}", mime, payload))
        }
    }

    /// The value to assign to an image element's source.
    pub fn src(&self) -> &str {
        match self {
            Self::Inline(uri) | Self::External(uri) => uri,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// Raw image bytes of an inline base64 data URI.
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        use base64::Engine;

        let Self::Inline(uri) = self else {
            return None;
        };
        let (_, data) = uri.split_once(";base64,")?;
        base64::engine::general_purpose::STANDARD.decode(data).ok()
    }
}

/// Where a cache entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Injected by the caller
    Inline,
    /// Committed after a bundle load
    Bundle,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    image: ResolvedImage,
    origin: EntryOrigin,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, CacheEntry>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&ResolvedImage> {
        self.entries.get(path).map(|entry| &entry.image)
    }

    pub fn origin(&self, path: &str) -> Option<EntryOrigin> {
        self.entries.get(path).map(|entry| entry.origin)
    }

    /// Store a caller-supplied image, replacing whatever was there.
    pub fn put(&mut self, path: impl Into<String>, image: ResolvedImage) {
        self.entries.insert(
            path.into(),
            CacheEntry {
                image,
                origin: EntryOrigin::Inline,
            },
        );
    }

    /// Store a bundle-sourced image unless the path already has one.
    ///
    /// Returns whether the image was stored.
    pub fn commit(&mut self, path: impl Into<String>, image: ResolvedImage) -> bool {
        match self.entries.entry(path.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    image,
                    origin: EntryOrigin::Bundle,
                });
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
