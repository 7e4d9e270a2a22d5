//! Atlas configuration.

use serde::{Deserialize, Serialize};

use crate::bundle::BundleFormat;
use crate::defaults;
use crate::error::{Error, Result};

/// Runtime configuration for atlas resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Location of the manifest document, relative to the asset source
    #[serde(default = "defaults::manifest_path")]
    pub manifest_path: String,
    /// Resolve through bundles at all; when false every path is a direct reference
    #[serde(default = "defaults::use_atlas")]
    pub use_atlas: bool,
    /// Fetch plain `.json` bundles instead of gzip `.gtbl` bundles
    #[serde(default = "defaults::use_json")]
    pub use_json: bool,
    /// Items are `.webp` images instead of `.png`
    #[serde(default = "defaults::use_webp")]
    pub use_webp: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            manifest_path: defaults::manifest_path(),
            use_atlas: defaults::use_atlas(),
            use_json: defaults::use_json(),
            use_webp: defaults::use_webp(),
        }
    }
}

impl AtlasConfig {
    /// Parse a configuration document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::from)
    }

    /// Build a configuration from the defaults overridden by `GTBL_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(defaults::ENV_MANIFEST_PATH) {
            let path = path.trim();
            if path.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{} must not be empty",
                    defaults::ENV_MANIFEST_PATH
                )));
            }
            self.manifest_path = path.to_string();
        }
        if let Some(value) = lookup(defaults::ENV_USE_ATLAS) {
            self.use_atlas = parse_flag(defaults::ENV_USE_ATLAS, &value)?;
        }
        if let Some(value) = lookup(defaults::ENV_USE_JSON) {
            self.use_json = parse_flag(defaults::ENV_USE_JSON, &value)?;
        }
        if let Some(value) = lookup(defaults::ENV_USE_WEBP) {
            self.use_webp = parse_flag(defaults::ENV_USE_WEBP, &value)?;
        }
        Ok(self)
    }

    /// Wire variant of the bundles this configuration fetches.
    pub fn bundle_format(&self) -> BundleFormat {
        if self.use_json {
            BundleFormat::Json
        } else {
            BundleFormat::Gzip
        }
    }

    /// Extension appended to item names when building logical paths.
    pub fn image_extension(&self) -> &'static str {
        if self.use_webp {
            defaults::WEBP_EXT
        } else {
            defaults::PNG_EXT
        }
    }

    /// MIME type used when wrapping bundle payloads into data URIs.
    pub fn image_mime(&self) -> &'static str {
        if self.use_webp {
            defaults::WEBP_MIME
        } else {
            defaults::PNG_MIME
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::InvalidConfig(format!(
            "{} expects a boolean, got '{}'",
            key, other
        ))),
    }
}
