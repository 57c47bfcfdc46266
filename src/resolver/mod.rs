//! Tiered image resolution
//!
//! Resolution chain (first hit wins, always in this order):
//! 1. Memory tier
//! 2. Disk tier, writing the image back into memory
//! 3. Network tier, writing the image back into memory and disk
//!
//! Memory and disk faults are logged and treated as misses. Only a network
//! failure ends a resolution in [`LoadState::Failed`]. Write-through is best
//! effort: its failures are logged and never change the outcome.
//!
//! Concurrent resolutions of the same key are not coalesced; each runs the
//! whole chain and may issue its own network request.

pub mod state;

pub use state::{LoadKind, LoadState, TierSource};

use crate::config::Config;
use crate::error::{StashError, StashResult};
use crate::image::{Image, ImageCodec, SniffingCodec};
use crate::tier::{DiskStore, DiskTier, ImageSource, MemoryStore, MemoryTier, NetworkTier};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The shared tier instances a resolver falls back through
#[derive(Clone)]
pub struct Tiers {
    pub memory: Arc<dyn MemoryStore>,
    pub disk: Arc<dyn DiskStore>,
    pub network: Arc<dyn ImageSource>,
}

impl Tiers {
    pub fn new(
        memory: Arc<dyn MemoryStore>,
        disk: Arc<dyn DiskStore>,
        network: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            memory,
            disk,
            network,
        }
    }

    /// Build the default tiers from configuration.
    ///
    /// Call once at startup and hand clones to every resolver so they all
    /// share the same caches.
    pub fn from_config(config: &Config) -> StashResult<Self> {
        let disk = DiskTier::from_config(&config.disk)?;
        debug!("Disk tier rooted at {}", disk.directory().display());

        Ok(Self::new(
            Arc::new(MemoryTier::from_config(&config.memory)),
            Arc::new(disk),
            Arc::new(NetworkTier::from_config(&config.network)),
        ))
    }
}

/// A `(key, locator)` pair as last passed to [`Resolver::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub key: String,
    pub locator: String,
}

/// Resolves images through the memory, disk and network tiers
pub struct Resolver {
    tiers: Tiers,
    codec: Arc<dyn ImageCodec>,
    state: watch::Sender<LoadState>,
    last_request: watch::Sender<Option<ImageRequest>>,
}

impl Resolver {
    /// Resolver using [`SniffingCodec`]
    pub fn new(tiers: Tiers) -> Self {
        Self::with_codec(tiers, Arc::new(SniffingCodec))
    }

    pub fn with_codec(tiers: Tiers, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            tiers,
            codec,
            state: watch::Sender::new(LoadState::Idle),
            last_request: watch::Sender::new(None),
        }
    }

    /// Observe the state of [`Resolver::resolve`] calls on this resolver.
    ///
    /// The latest call wins: a new call overwrites whatever an earlier one
    /// left behind. Write-through may still be in flight when `Success` is
    /// observed here; the value returned by `resolve` is published after it.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn last_request(&self) -> Option<ImageRequest> {
        self.last_request.borrow().clone()
    }

    /// Run the fallback chain for `key`, publishing progress to
    /// [`Resolver::subscribe`] and returning the terminal state.
    pub async fn resolve(&self, key: &str, locator: &str) -> LoadState {
        self.last_request.send_replace(Some(ImageRequest {
            key: key.to_string(),
            locator: locator.to_string(),
        }));
        self.run(key, locator, &self.state).await
    }

    /// Re-run the full chain for the most recent request
    pub async fn refresh(&self) -> StashResult<LoadState> {
        let request = self.last_request().ok_or(StashError::NoPreviousRequest)?;
        Ok(self.resolve(&request.key, &request.locator).await)
    }

    /// Run the chain on a spawned task with its own state channel.
    ///
    /// Dropping the returned [`Resolution`] detaches the task; it still runs
    /// to completion, write-through included.
    pub fn start(self: &Arc<Self>, key: &str, locator: &str) -> Resolution {
        let (tx, rx) = watch::channel(LoadState::Idle);
        let resolver = Arc::clone(self);
        let key = key.to_string();
        let locator = locator.to_string();

        let task = tokio::spawn(async move { resolver.run(&key, &locator, &tx).await });

        Resolution { state: rx, task }
    }

    async fn run(&self, key: &str, locator: &str, state: &watch::Sender<LoadState>) -> LoadState {
        if let Some(image) = self.from_memory(key) {
            info!("Loaded image for key {} from memory", key);
            return publish(state, LoadState::success(image, TierSource::Memory));
        }

        if let Some(image) = self.from_disk(key).await {
            info!("Loaded image for key {} from disk", key);
            let done = publish(state, LoadState::success(image.clone(), TierSource::Disk));
            if let Some(data) = self.encode_for_storage(key, &image) {
                self.write_memory(key, data);
            }
            return done;
        }

        publish(state, LoadState::Loading);

        match self.from_network(locator).await {
            Ok(image) => {
                info!("Loaded image for key {} from network", key);
                let done = publish(state, LoadState::success(image.clone(), TierSource::Network));
                if let Some(data) = self.encode_for_storage(key, &image) {
                    self.write_memory(key, data.clone());
                    self.write_disk(key, &data).await;
                }
                done
            }
            Err(e) => {
                error!("Failed to load image {} from network: {}", key, e);
                publish(state, LoadState::failed(e))
            }
        }
    }

    fn from_memory(&self, key: &str) -> Option<Image> {
        match self.tiers.memory.get(key) {
            Ok(Some(data)) => self.decode_cached(key, &data, TierSource::Memory),
            Ok(None) => {
                debug!("Memory miss for key {}", key);
                None
            }
            Err(e) => {
                warn!("Error loading image from memory: {}", e);
                None
            }
        }
    }

    async fn from_disk(&self, key: &str) -> Option<Image> {
        match self.tiers.disk.retrieve_image(key).await {
            Ok(Some(data)) => self.decode_cached(key, &data, TierSource::Disk),
            Ok(None) => {
                debug!("Disk miss for key {}", key);
                None
            }
            Err(e) => {
                warn!("Error loading image from disk: {}", e);
                None
            }
        }
    }

    async fn from_network(&self, locator: &str) -> StashResult<Image> {
        let data = self.tiers.network.fetch_image(locator).await?;
        self.codec.decode(&data)
    }

    fn decode_cached(&self, key: &str, data: &Bytes, source: TierSource) -> Option<Image> {
        match self.codec.decode(data) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Ignoring undecodable {} entry for key {}: {}", source, key, e);
                None
            }
        }
    }

    fn encode_for_storage(&self, key: &str, image: &Image) -> Option<Bytes> {
        match self.codec.encode(image) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Skipping write-through for key {}: {}", key, e);
                None
            }
        }
    }

    fn write_memory(&self, key: &str, data: Bytes) {
        if let Err(e) = self.tiers.memory.set(key, data) {
            warn!("Failed to cache image {} in memory: {}", key, e);
        }
    }

    async fn write_disk(&self, key: &str, data: &Bytes) {
        if let Err(e) = self.tiers.disk.save(key, data).await {
            warn!("Failed to save image {} to disk: {}", key, e);
        }
    }
}

fn publish(state: &watch::Sender<LoadState>, next: LoadState) -> LoadState {
    state.send_replace(next.clone());
    next
}

/// Handle to a resolution running on its own task
pub struct Resolution {
    state: watch::Receiver<LoadState>,
    task: JoinHandle<LoadState>,
}

impl Resolution {
    /// Receiver for this resolution's state transitions.
    ///
    /// Write-through may still be in flight when `Success` is observed;
    /// [`Resolution::finish`] returns only after it completes.
    pub fn state(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }

    pub fn current(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Wait for the terminal state
    pub async fn finish(self) -> LoadState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => LoadState::failed(StashError::Internal(format!(
                "resolution task ended abnormally: {}",
                e
            ))),
        }
    }
}
