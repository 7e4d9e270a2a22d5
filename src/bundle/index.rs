//! Manifest-driven path index.
//!
//! Maps every logical image path named by a manifest to the bundle that
//! carries its payload.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::bundle::{strip_extension, BundleFormat, BundleId};
use crate::error::{Error, Result};

/// Manifest document: group key -> ordered item names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// Parse a manifest document fetched from `location`.
    pub fn from_slice(bytes: &[u8], location: &str) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::ManifestUnavailable {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }

    /// Total number of (group, item) pairs.
    pub fn item_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Directory that a manifest's bundles live under: its location minus the extension.
pub fn manifest_base(location: &str) -> &str {
    strip_extension(location)
}

/// Logical path -> owning bundle.
#[derive(Debug, Default)]
pub struct PathIndex {
    entries: HashMap<String, BundleId>,
    loaded: HashSet<String>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every item of `manifest`, once per manifest location.
    ///
    /// Returns `false` without touching the index when `location` was already built.
    pub fn build(
        &mut self,
        manifest: &Manifest,
        location: &str,
        format: BundleFormat,
        image_extension: &str,
    ) -> bool {
        if !self.loaded.insert(location.to_string()) {
            return false;
        }

        let base = manifest_base(location);
        for (group, items) in &manifest.groups {
            let bundle = BundleId::new(base, group, format);
            for item in items {
                let path = format!("{}/{}/{}{}", base, group, item, image_extension);
                self.entries.insert(path, bundle.clone());
            }
        }

        log::debug!(
            "Indexed {} items in {} bundles from {}",
            manifest.item_count(),
            manifest.groups.len(),
            location
        );
        true
    }

    /// Bundle owning `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&BundleId> {
        self.entries.get(path)
    }

    pub fn is_loaded(&self, location: &str) -> bool {
        self.loaded.contains(location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
