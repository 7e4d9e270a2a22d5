//! Error types for gtbl.

use thiserror::Error;

/// gtbl error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Bundle could not be decompressed or parsed
    #[error("Corrupt bundle '{bundle}': {reason}")]
    CorruptBundle { bundle: String, reason: String },

    /// Manifest could not be fetched or parsed
    #[error("Manifest '{location}' unavailable: {reason}")]
    ManifestUnavailable { location: String, reason: String },

    /// A requested item was not produced by its bundle
    #[error("Item '{path}' not resolved from bundle '{bundle}'")]
    UnresolvedItem { path: String, bundle: String },

    /// Asset source failed to deliver bytes
    #[error("Failed to fetch '{location}': {reason}")]
    Fetch { location: String, reason: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn corrupt(bundle: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptBundle {
            bundle: bundle.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for gtbl operations.
pub type Result<T> = std::result::Result<T, Error>;
