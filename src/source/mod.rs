//! Asset sources for manifests and bundles.
//!
//! This module provides:
//! - The `AssetSource` fetch abstraction
//! - A local directory backend (`file`)
//! - An HTTP backend (`http`)

pub mod file;
pub mod http;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

pub use file::FileSource;
pub use http::HttpSource;

/// Boxed future returned by [`AssetSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Fetches raw bytes for a manifest or bundle location.
///
/// Implementations must not retry; a failed fetch is reported once.
pub trait AssetSource: Send + Sync {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a>;
}

impl<S: AssetSource + ?Sized> AssetSource for std::sync::Arc<S> {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a> {
        (**self).fetch(location)
    }
}
