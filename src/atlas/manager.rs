//! Atlas manager: the runtime entry point for image resolution.
//!
//! Requests flow cache -> path index -> bundle loader. The index, the cache
//! and the waiter queues share one lock, so a lookup and the LOADING
//! transition it triggers are a single atomic step. The lock is never held
//! across an await or while a consumer is being called.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::atlas::cache::{ResolutionCache, ResolvedImage};
use crate::atlas::loader::{commit_contents, Delivery, ImageSink, LoadQueue, Waiter};
use crate::bundle::{codec, BundleContents, BundleId, BundleLoadState, Manifest, PathIndex};
use crate::config::AtlasConfig;
use crate::error::{Error, Result};
use crate::source::AssetSource;

#[derive(Default)]
struct AtlasState {
    index: PathIndex,
    cache: ResolutionCache,
    queue: LoadQueue,
}

struct Inner {
    config: AtlasConfig,
    source: Box<dyn AssetSource>,
    state: Mutex<AtlasState>,
    /// Serializes manifest loads so a location is fetched once.
    manifest_gate: tokio::sync::Mutex<()>,
}

enum Dispatch {
    Ready(Waiter, ResolvedImage),
    Fetch(BundleId),
    Queued,
}

/// Resolves logical image paths to inline bundle payloads or direct references.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct AtlasManager {
    inner: Arc<Inner>,
}

impl AtlasManager {
    /// Create a manager that reads manifests and bundles from `source`.
    pub fn new(config: AtlasConfig, source: impl AssetSource + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                source: Box::new(source),
                state: Mutex::new(AtlasState::default()),
                manifest_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.inner.config
    }

    /// Load the configured manifest.
    ///
    /// With atlas support disabled this completes immediately. On error the
    /// caller decides whether to carry on without atlas support; every
    /// request then falls through to a direct reference.
    pub async fn init(&self) -> Result<()> {
        if !self.inner.config.use_atlas {
            log::debug!("Atlas support disabled; skipping manifest load");
            return Ok(());
        }
        let location = self.inner.config.manifest_path.clone();
        self.load_manifest(&location).await.map(|_| ())
    }

    /// Fetch, parse and index the manifest at `location`.
    ///
    /// Returns `false` if the location was already indexed. A failed load
    /// leaves no trace and may be retried.
    pub async fn load_manifest(&self, location: &str) -> Result<bool> {
        let _gate = self.inner.manifest_gate.lock().await;

        let already_loaded = self.inner.lock_state().index.is_loaded(location);
        if already_loaded {
            return Ok(false);
        }

        let bytes = self
            .inner
            .source
            .fetch(location)
            .await
            .map_err(|e| Error::ManifestUnavailable {
                location: location.to_string(),
                reason: e.to_string(),
            })?;
        let manifest = Manifest::from_slice(&bytes, location)?;

        let config = &self.inner.config;
        let built = self.inner.lock_state().index.build(
            &manifest,
            location,
            config.bundle_format(),
            config.image_extension(),
        );

        log::info!(
            "Loaded atlas manifest {} ({} bundles, {} items)",
            location,
            manifest.groups.len(),
            manifest.item_count()
        );
        Ok(built)
    }

    /// Register an already-resolved image for `path`, replacing any previous one.
    pub fn set_inline_image(&self, path: impl Into<String>, image: ResolvedImage) {
        self.inner.lock_state().cache.put(path, image);
    }

    /// Resolve `path` and hand the result to `sink`.
    ///
    /// Cache hits and paths outside every bundle are delivered before this
    /// returns. Paths inside a bundle are delivered once that bundle's load
    /// settles, in request order. Bundle loads are spawned on the current
    /// Tokio runtime.
    pub fn request_image(&self, sink: Arc<dyn ImageSink>, path: &str) {
        self.dispatch(path, Delivery::Sink(sink));
    }

    /// Resolve `path`, waiting for its bundle if necessary.
    pub async fn resolve(&self, path: &str) -> ResolvedImage {
        let (tx, rx) = oneshot::channel();
        self.dispatch(path, Delivery::Channel(tx));
        rx.await
            .unwrap_or_else(|_| ResolvedImage::External(path.to_string()))
    }

    /// Cached image for `path`, without triggering any load.
    pub fn cached(&self, path: &str) -> Option<ResolvedImage> {
        self.inner.lock_state().cache.get(path).cloned()
    }

    /// Bundle owning `path` according to the loaded manifests.
    pub fn bundle_for(&self, path: &str) -> Option<BundleId> {
        self.inner.lock_state().index.resolve(path).cloned()
    }

    pub fn bundle_state(&self, bundle: &BundleId) -> BundleLoadState {
        self.inner.lock_state().queue.state(bundle)
    }

    /// Number of requests parked on `bundle`.
    pub fn pending_waiters(&self, bundle: &BundleId) -> usize {
        self.inner.lock_state().queue.pending_len(bundle)
    }

    fn dispatch(&self, path: &str, delivery: Delivery) {
        let waiter = Waiter::new(path, delivery);
        if !self.inner.config.use_atlas {
            waiter.deliver(ResolvedImage::External(path.to_string()));
            return;
        }

        let dispatch = {
            let mut state = self.inner.lock_state();
            if let Some(image) = state.cache.get(path) {
                Dispatch::Ready(waiter, image.clone())
            } else if let Some(bundle) = state.index.resolve(path).cloned() {
                if state.queue.enqueue(&bundle, waiter) {
                    Dispatch::Fetch(bundle)
                } else {
                    Dispatch::Queued
                }
            } else {
                Dispatch::Ready(waiter, ResolvedImage::External(path.to_string()))
            }
        };

        match dispatch {
            Dispatch::Ready(waiter, image) => waiter.deliver(image),
            Dispatch::Fetch(bundle) => self.spawn_load(bundle),
            Dispatch::Queued => {}
        }
    }

    fn spawn_load(&self, bundle: BundleId) {
        let inner = Arc::clone(&self.inner);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut guard = SettleGuard {
                        inner: Arc::clone(&inner),
                        bundle: Some(bundle.clone()),
                    };
                    let outcome = inner.load_bundle(&bundle).await;
                    guard.finish(outcome);
                });
            }
            Err(e) => {
                let outcome = Err(Error::Fetch {
                    location: bundle.to_string(),
                    reason: e.to_string(),
                });
                inner.settle(&bundle, outcome);
            }
        }
    }
}

/// Settles a spawned bundle load exactly once.
///
/// If the load task panics or is cancelled before finishing, dropping the
/// guard settles the bundle as failed so its waiters still get delivered.
struct SettleGuard {
    inner: Arc<Inner>,
    bundle: Option<BundleId>,
}

impl SettleGuard {
    fn finish(&mut self, outcome: Result<BundleContents>) {
        if let Some(bundle) = self.bundle.take() {
            self.inner.settle(&bundle, outcome);
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(bundle) = self.bundle.take() {
            let outcome = Err(Error::Fetch {
                location: bundle.to_string(),
                reason: "load task ended without settling".into(),
            });
            self.inner.settle(&bundle, outcome);
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, AtlasState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_bundle(&self, bundle: &BundleId) -> Result<BundleContents> {
        log::debug!("Fetching bundle {}", bundle);
        let bytes = self.source.fetch(bundle.as_str()).await?;
        codec::decode(&bytes, self.config.bundle_format())
            .map_err(|e| Error::corrupt(bundle.as_str(), e))
    }

    /// Commit a finished load and service every waiter parked on it.
    fn settle(&self, bundle: &BundleId, outcome: Result<BundleContents>) {
        let deliveries: Vec<(Waiter, Option<ResolvedImage>)> = {
            let mut state = self.lock_state();
            let load_state = match outcome {
                Ok(contents) => {
                    let stored = commit_contents(
                        &mut state.cache,
                        bundle,
                        &contents,
                        self.config.image_extension(),
                        self.config.image_mime(),
                    );
                    log::info!(
                        "Resolved bundle {} ({} items, {} new)",
                        bundle,
                        contents.len(),
                        stored
                    );
                    BundleLoadState::Resolved
                }
                Err(e) => {
                    log::warn!("Bundle {} failed to load: {}", bundle, e);
                    BundleLoadState::Failed
                }
            };

            let waiters = state.queue.settle(bundle, load_state);
            waiters
                .into_iter()
                .map(|waiter| {
                    let image = state.cache.get(waiter.path()).cloned();
                    (waiter, image)
                })
                .collect()
        };

        for (waiter, image) in deliveries {
            match image {
                Some(image) => waiter.deliver(image),
                None => waiter.fall_back(bundle),
            }
        }
    }
}
