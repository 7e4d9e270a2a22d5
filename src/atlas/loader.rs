//! Per-bundle waiter queues.
//!
//! The first request for a bundle opens its queue and owns the fetch; every
//! later request for the same bundle joins that queue until the load settles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::atlas::cache::{ResolutionCache, ResolvedImage};
use crate::bundle::{BundleContents, BundleId, BundleLoadState};
use crate::defaults;
use crate::error::Error;

/// Consumer of a resolved image, e.g. an image element awaiting its source.
pub trait ImageSink: Send + Sync {
    /// Receive the image source. Called exactly once per request.
    fn set_image(&self, image: ResolvedImage);

    /// Called before `set_image` when the request fell back to a direct reference.
    fn unresolved(&self, _warning: &Error) {}
}

impl<F> ImageSink for F
where
    F: Fn(ResolvedImage) + Send + Sync,
{
    fn set_image(&self, image: ResolvedImage) {
        self(image)
    }
}

pub(crate) enum Delivery {
    Sink(Arc<dyn ImageSink>),
    Channel(oneshot::Sender<ResolvedImage>),
}

/// A request parked on a bundle load.
pub(crate) struct Waiter {
    path: String,
    delivery: Delivery,
}

impl Waiter {
    pub(crate) fn new(path: &str, delivery: Delivery) -> Self {
        Self {
            path: path.to_string(),
            delivery,
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn deliver(self, image: ResolvedImage) {
        match self.delivery {
            Delivery::Sink(sink) => sink.set_image(image),
            Delivery::Channel(tx) => {
                // Receiver gone means the caller stopped waiting.
                let _ = tx.send(image);
            }
        }
    }

    /// Deliver the logical path itself as a direct reference.
    pub(crate) fn fall_back(self, bundle: &BundleId) {
        let warning = Error::UnresolvedItem {
            path: self.path.clone(),
            bundle: bundle.to_string(),
        };
        log::warn!("{}; falling back to direct reference", warning);

        if let Delivery::Sink(sink) = &self.delivery {
            sink.unresolved(&warning);
        }
        let image = ResolvedImage::External(self.path.clone());
        self.deliver(image);
    }
}

/// Outstanding loads keyed by bundle, plus the last outcome of settled ones.
#[derive(Default)]
pub(crate) struct LoadQueue {
    pending: HashMap<BundleId, Vec<Waiter>>,
    settled: HashMap<BundleId, BundleLoadState>,
}

impl LoadQueue {
    /// Park `waiter` on `bundle`.
    ///
    /// Returns `true` when this call moved the bundle to LOADING, in which
    /// case the caller must issue the one fetch.
    pub(crate) fn enqueue(&mut self, bundle: &BundleId, waiter: Waiter) -> bool {
        if let Some(queue) = self.pending.get_mut(bundle) {
            queue.push(waiter);
            return false;
        }
        self.pending.insert(bundle.clone(), vec![waiter]);
        true
    }

    /// Close the queue for `bundle`, returning its waiters in enqueue order.
    pub(crate) fn settle(&mut self, bundle: &BundleId, outcome: BundleLoadState) -> Vec<Waiter> {
        self.settled.insert(bundle.clone(), outcome);
        self.pending.remove(bundle).unwrap_or_default()
    }

    pub(crate) fn state(&self, bundle: &BundleId) -> BundleLoadState {
        if self.pending.contains_key(bundle) {
            return BundleLoadState::Loading;
        }
        self.settled
            .get(bundle)
            .copied()
            .unwrap_or(BundleLoadState::Idle)
    }

    pub(crate) fn pending_len(&self, bundle: &BundleId) -> usize {
        self.pending.get(bundle).map_or(0, Vec::len)
    }
}

/// Item key with any image extension removed; producers write both `a` and `a.png`.
pub(crate) fn item_stem(key: &str) -> &str {
    [defaults::PNG_EXT, defaults::WEBP_EXT]
        .iter()
        .find_map(|ext| key.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(key)
}

/// Commit every payload of a decoded bundle. Returns how many paths were newly stored.
pub(crate) fn commit_contents(
    cache: &mut ResolutionCache,
    bundle: &BundleId,
    contents: &BundleContents,
    image_extension: &str,
    mime: &str,
) -> usize {
    let base = bundle.item_base();
    let mut stored = 0;
    for (key, payload) in contents {
        let path = format!("{}/{}{}", base, item_stem(key), image_extension);
        if cache.commit(path, ResolvedImage::from_payload(payload, mime)) {
            stored += 1;
        }
    }
    stored
}
