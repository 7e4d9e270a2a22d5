//! Default values for atlas configuration and wire formats.

pub const MANIFEST_PATH: &str = "atlas.json";
pub const USE_ATLAS: bool = true;
pub const USE_JSON: bool = false;
pub const USE_WEBP: bool = false;

pub const GZIP_BUNDLE_EXT: &str = ".gtbl";
pub const JSON_BUNDLE_EXT: &str = ".json";
pub const PNG_EXT: &str = ".png";
pub const WEBP_EXT: &str = ".webp";

pub const PNG_MIME: &str = "image/png";
pub const WEBP_MIME: &str = "image/webp";
pub const DATA_URI_SCHEME: &str = "data:";

pub const ENV_MANIFEST_PATH: &str = "GTBL_MANIFEST_PATH";
pub const ENV_USE_ATLAS: &str = "GTBL_USE_ATLAS";
pub const ENV_USE_JSON: &str = "GTBL_USE_JSON";
pub const ENV_USE_WEBP: &str = "GTBL_USE_WEBP";

pub const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn manifest_path() -> String { MANIFEST_PATH.to_string() }
pub fn use_atlas() -> bool { USE_ATLAS }
pub fn use_json() -> bool { USE_JSON }
pub fn use_webp() -> bool { USE_WEBP }
