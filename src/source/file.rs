//! Local directory asset source.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::source::{AssetSource, FetchFuture};

/// Reads locations relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(Error::Fetch {
                location: location.to_string(),
                reason: "path escapes the asset root".into(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FileSource {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let path = self.resolve(location)?;
            log::debug!("Reading asset {:?}", path);
            tokio::fs::read(&path).await.map_err(|e| Error::Fetch {
                location: location.to_string(),
                reason: e.to_string(),
            })
        })
    }
}
