use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use gtbl::{
    codec, AssetSource, AtlasConfig, AtlasManager, BundleContents, BundleFormat, Error,
    FetchFuture, ImageSink, ResolvedImage,
};

pub(crate) const PNG_A: &str = "iVBORw0KGgoAAAANSUhEUgAAAAE=";
pub(crate) const PNG_B: &str = "iVBORw0KGgoAAAANSUhEUgAAAAI=";

enum Response {
    Bytes(Vec<u8>),
    Fail(String),
}

#[derive(Default)]
struct SourceState {
    responses: HashMap<String, VecDeque<Response>>,
    fetches: HashMap<String, usize>,
    gates: HashMap<String, Arc<Semaphore>>,
}

/// In-memory asset source with per-location fetch counters and gates.
#[derive(Clone, Default)]
pub(crate) struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response; the last queued response repeats.
    pub(crate) fn serve(&self, location: &str, bytes: Vec<u8>) -> &Self {
        self.push(location, Response::Bytes(bytes));
        self
    }

    pub(crate) fn fail(&self, location: &str, reason: &str) -> &Self {
        self.push(location, Response::Fail(reason.to_string()));
        self
    }

    /// Hold fetches of `location` until `release` is called.
    pub(crate) fn gate(&self, location: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(location.to_string(), Arc::new(Semaphore::new(0)));
        self
    }

    pub(crate) fn release(&self, location: &str) {
        let state = self.state.lock().unwrap();
        if let Some(gate) = state.gates.get(location) {
            gate.add_permits(1);
        }
    }

    pub(crate) fn fetch_count(&self, location: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fetches
            .get(location)
            .copied()
            .unwrap_or(0)
    }

    fn push(&self, location: &str, response: Response) {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(location.to_string())
            .or_default()
            .push_back(response);
    }

    fn next_response(&self, location: &str) -> Result<Vec<u8>, Error> {
        let mut state = self.state.lock().unwrap();
        let queue = state.responses.get_mut(location);
        let response = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().map(|r| match r {
                Response::Bytes(b) => Response::Bytes(b.clone()),
                Response::Fail(reason) => Response::Fail(reason.clone()),
            }),
            None => None,
        };
        match response {
            Some(Response::Bytes(bytes)) => Ok(bytes),
            Some(Response::Fail(reason)) => Err(Error::Fetch {
                location: location.to_string(),
                reason,
            }),
            None => Err(Error::Fetch {
                location: location.to_string(),
                reason: "not found".into(),
            }),
        }
    }
}

impl AssetSource for MemorySource {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let gate = {
                let mut state = self.state.lock().unwrap();
                *state.fetches.entry(location.to_string()).or_default() += 1;
                state.gates.get(location).cloned()
            };
            if let Some(gate) = gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            self.next_response(location)
        })
    }
}

/// Sink that forwards every delivery, with its warnings, to a channel.
pub(crate) struct ChannelSink {
    tag: usize,
    tx: mpsc::UnboundedSender<Delivered>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delivered {
    pub(crate) tag: usize,
    pub(crate) image: ResolvedImage,
    pub(crate) warnings: usize,
}

impl ImageSink for ChannelSink {
    fn set_image(&self, image: ResolvedImage) {
        let _ = self.tx.send(Delivered {
            tag: self.tag,
            image,
            warnings: 0,
        });
    }

    fn unresolved(&self, warning: &Error) {
        assert!(matches!(warning, Error::UnresolvedItem { .. }));
        let _ = self.tx.send(Delivered {
            tag: self.tag,
            image: ResolvedImage::External(String::new()),
            warnings: 1,
        });
    }
}

/// Collects deliveries from any number of `ChannelSink`s.
pub(crate) struct Deliveries {
    tx: mpsc::UnboundedSender<Delivered>,
    rx: mpsc::UnboundedReceiver<Delivered>,
}

impl Deliveries {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub(crate) fn sink(&self, tag: usize) -> Arc<dyn ImageSink> {
        Arc::new(ChannelSink {
            tag,
            tx: self.tx.clone(),
        })
    }

    /// Wait for `count` images, folding warning events into the delivery that follows them.
    pub(crate) async fn take(&mut self, count: usize) -> Vec<Delivered> {
        let mut out = Vec::new();
        let mut warned: HashMap<usize, usize> = HashMap::new();
        while out.len() < count {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for delivery")
                .expect("channel closed");
            if event.warnings > 0 {
                *warned.entry(event.tag).or_default() += event.warnings;
                continue;
            }
            out.push(Delivered {
                warnings: warned.remove(&event.tag).unwrap_or(0),
                ..event
            });
        }
        out
    }

    pub(crate) fn try_take(&mut self) -> Option<Delivered> {
        self.rx.try_recv().ok()
    }
}

pub(crate) fn bundle(pairs: &[(&str, &str)], format: BundleFormat) -> Vec<u8> {
    let contents: BundleContents = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    codec::encode(&contents, format).expect("encode bundle")
}

pub(crate) fn data_uri(payload: &str) -> ResolvedImage {
    ResolvedImage::Inline(format!("data:image/png;base64,{}", payload))
}

/// Manager over `source` with a manifest `{"icons": ["a", "b", "c"]}` at `x.json`.
pub(crate) async fn icons_manager(source: &MemorySource) -> AtlasManager {
    source.serve("x.json", br#"{"icons": ["a", "b", "c"]}"#.to_vec());
    let config = AtlasConfig {
        manifest_path: "x.json".into(),
        ..AtlasConfig::default()
    };
    let manager = AtlasManager::new(config, source.clone());
    manager.init().await.expect("init");
    manager
}
