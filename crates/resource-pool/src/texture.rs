//! Texture pool: bounded LRU cache of decoded bitmaps keyed by asset id.
//!
//! # Limits
//!
//! Two hard caps apply, both scaled by the current [`PerformanceMode`]:
//!
//! 1. **Entry count.** Inserting while at the cap evicts the least recently
//!    touched entries first, dropping `eviction_fraction` (30%) of the pool
//!    in one go so the next few inserts do not evict again.
//! 2. **Byte budget.** After that, single LRU entries are evicted until the
//!    incoming bitmap fits.
//!
//! Evicted bitmaps are handed to [`TextureLoader::release`] immediately.
//!
//! # Loads
//!
//! [`TexturePool::request`] never blocks. A miss starts one tokio task per
//! `(asset id, source url)`; concurrent requests join it. Completions come
//! back over a channel and are applied by [`TexturePool::poll_completions`]
//! or [`TexturePool::next_completion`] on the owning thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipdeck_common::config::PoolConfig;
use clipdeck_common::error::{ClipdeckError, ClipdeckResult};
use clipdeck_common::events::{PerformanceEvent, PerformanceMode, Severity};
use clipdeck_timeline_model::asset::{Asset, AssetId};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::bitmap::DecodedBitmap;
use crate::loader::TextureLoader;
use crate::pending::{BeginLoad, LoadTicket, PendingKey, PendingTable};

/// Texture pool limits.
#[derive(Debug, Clone)]
pub struct TexturePoolConfig {
    /// Maximum retained entries in normal mode.
    pub capacity: usize,
    /// Maximum retained bytes in normal mode.
    pub byte_budget: usize,
    /// Share of entries evicted when the entry cap is reached.
    pub eviction_fraction: f64,
    /// How long a failed asset waits before it may be fetched again.
    pub retry_delay: Duration,
}

impl Default for TexturePoolConfig {
    fn default() -> Self {
        Self::from(&PoolConfig::default())
    }
}

impl From<&PoolConfig> for TexturePoolConfig {
    fn from(config: &PoolConfig) -> Self {
        Self {
            capacity: config.texture_capacity.max(1),
            byte_budget: config.texture_byte_budget,
            eviction_fraction: config.eviction_fraction.clamp(0.0, 1.0),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// A cached texture.
#[derive(Debug, Clone)]
pub struct PooledTexture {
    pub key: AssetId,
    pub bitmap: Arc<DecodedBitmap>,
    /// Access sequence number; larger is more recent.
    pub last_accessed: u64,
    pub byte_size: usize,
}

/// What the compositor can do with an asset right now.
#[derive(Debug, Clone)]
pub enum TextureState {
    /// Decoded and cached.
    Ready(Arc<DecodedBitmap>),
    /// A load is in flight.
    Loading,
    /// The last load failed; the message explains why.
    Failed(String),
}

/// Result of applying one load completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The bitmap is now cached.
    Loaded(AssetId),
    /// The load failed and the asset is flagged.
    Failed(AssetId),
    /// The completion belonged to a superseded load and was dropped.
    Stale(AssetId),
}

impl CompletionOutcome {
    pub fn asset_id(&self) -> &str {
        match self {
            Self::Loaded(id) | Self::Failed(id) | Self::Stale(id) => id,
        }
    }

    /// Whether applying this completion changed what a frame would show.
    pub fn changes_frame(&self) -> bool {
        !matches!(self, Self::Stale(_))
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TexturePoolStats {
    pub hits: u64,
    pub misses: u64,
    pub loads_started: u64,
    pub loads_joined: u64,
    pub loads_failed: u64,
    pub stale_completions: u64,
    pub evictions: u64,
    pub retained_entries: usize,
    pub retained_bytes: usize,
}

#[derive(Debug, Clone)]
struct FailedLoad {
    message: String,
    failed_at: Instant,
    /// Permanent failures (e.g. unsupported asset types) are never retried.
    retryable: bool,
}

struct LoadCompletion {
    key: PendingKey,
    ticket: LoadTicket,
    result: ClipdeckResult<DecodedBitmap>,
}

/// Bounded cache of decoded textures.
pub struct TexturePool {
    config: TexturePoolConfig,
    mode: PerformanceMode,
    loader: Arc<dyn TextureLoader>,
    entries: HashMap<AssetId, PooledTexture>,
    bytes: usize,
    access_seq: u64,
    pending: PendingTable,
    failures: HashMap<AssetId, FailedLoad>,
    /// Bumped on every full clear; loads from older epochs are stale.
    epoch: u64,
    completions_tx: mpsc::UnboundedSender<LoadCompletion>,
    completions_rx: mpsc::UnboundedReceiver<LoadCompletion>,
    stats: TexturePoolStats,
    shut_down: bool,
}

impl TexturePool {
    /// Create an empty pool using `loader` for misses.
    pub fn new(config: TexturePoolConfig, loader: Arc<dyn TextureLoader>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        tracing::info!(
            capacity = config.capacity,
            byte_budget = config.byte_budget,
            "texture pool created"
        );
        Self {
            config,
            mode: PerformanceMode::Normal,
            loader,
            entries: HashMap::new(),
            bytes: 0,
            access_seq: 0,
            pending: PendingTable::new(),
            failures: HashMap::new(),
            epoch: 0,
            completions_tx,
            completions_rx,
            stats: TexturePoolStats::default(),
            shut_down: false,
        }
    }

    /// Entry cap for the current mode.
    pub fn effective_capacity(&self) -> usize {
        scaled(self.config.capacity, self.mode).max(1)
    }

    /// Byte budget for the current mode.
    pub fn effective_byte_budget(&self) -> usize {
        scaled(self.config.byte_budget, self.mode)
    }

    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently retained.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether any load is in flight.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.pending.is_pending(key)
    }

    pub fn is_failed(&self, key: &str) -> bool {
        self.failures.contains_key(key)
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn stats(&self) -> TexturePoolStats {
        TexturePoolStats {
            retained_entries: self.entries.len(),
            retained_bytes: self.bytes,
            ..self.stats.clone()
        }
    }

    /// Look up a cached bitmap, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Arc<DecodedBitmap>> {
        self.access_seq += 1;
        let seq = self.access_seq;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = seq;
                self.stats.hits += 1;
                Some(Arc::clone(&entry.bitmap))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a bitmap, evicting as needed to stay within both caps.
    ///
    /// Re-inserting a key replaces its bitmap. Returns `None` when the
    /// bitmap alone is larger than the byte budget; it is then not cached.
    pub fn set(&mut self, key: impl Into<AssetId>, bitmap: DecodedBitmap) -> Option<Arc<DecodedBitmap>> {
        let key = key.into();
        let byte_size = bitmap.byte_size();

        if let Some(old) = self.entries.remove(&key) {
            self.bytes = self.bytes.saturating_sub(old.byte_size);
            self.loader.release(&key, &old.bitmap);
        }

        if byte_size > self.effective_byte_budget() {
            tracing::warn!(
                asset_id = %key,
                bytes = byte_size,
                budget = self.effective_byte_budget(),
                "texture larger than byte budget, not cached"
            );
            self.loader.release(&key, &bitmap);
            return None;
        }

        self.make_room(byte_size);

        self.access_seq += 1;
        let bitmap = Arc::new(bitmap);
        self.entries.insert(
            key.clone(),
            PooledTexture {
                key: key.clone(),
                bitmap: Arc::clone(&bitmap),
                last_accessed: self.access_seq,
                byte_size,
            },
        );
        self.bytes += byte_size;
        self.failures.remove(&key);
        tracing::trace!(asset_id = %key, bytes = byte_size, entries = self.entries.len(), "texture cached");
        Some(bitmap)
    }

    /// Resolve an asset to a texture, starting a load on a miss.
    pub fn request(&mut self, asset: &Asset) -> TextureState {
        if self.shut_down {
            return TextureState::Failed("texture pool is shut down".to_string());
        }
        if let Some(bitmap) = self.get(&asset.id) {
            return TextureState::Ready(bitmap);
        }
        if let Some(failure) = self.failures.get(&asset.id) {
            return TextureState::Failed(failure.message.clone());
        }

        match self.pending.begin(PendingKey::for_asset(asset), self.epoch) {
            BeginLoad::Joined => {
                self.stats.loads_joined += 1;
                TextureState::Loading
            }
            BeginLoad::Started(ticket) => self.spawn_load(asset.clone(), ticket),
        }
    }

    fn spawn_load(&mut self, asset: Asset, ticket: LoadTicket) -> TextureState {
        let key = PendingKey::for_asset(&asset);
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.pending.complete(&key, ticket);
                let message = format!("no async runtime to load texture: {e}");
                self.record_failure(&asset.id, message.clone(), true);
                return TextureState::Failed(message);
            }
        };

        self.stats.loads_started += 1;
        tracing::debug!(asset_id = %asset.id, ticket = ticket.id, "texture load started");

        let loader = Arc::clone(&self.loader);
        let tx = self.completions_tx.clone();
        runtime.spawn(async move {
            let result = loader.load(&asset).await;
            // The pool may be gone; nobody is left to apply the result then.
            let _ = tx.send(LoadCompletion {
                key,
                ticket,
                result,
            });
        });
        TextureState::Loading
    }

    /// Apply every completion that has arrived, without waiting.
    pub fn poll_completions(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            outcomes.push(self.apply_completion(completion));
        }
        outcomes
    }

    /// Wait for the next completion and apply it.
    ///
    /// Only resolves when a load finishes; check [`Self::has_pending`]
    /// before awaiting outside a `select!`.
    pub async fn next_completion(&mut self) -> CompletionOutcome {
        loop {
            // The pool owns a sender, so the channel never closes.
            if let Some(completion) = self.completions_rx.recv().await {
                return self.apply_completion(completion);
            }
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) -> CompletionOutcome {
        let LoadCompletion {
            key,
            ticket,
            result,
        } = completion;
        let asset_id = key.asset_id.clone();

        let Some(elapsed) = self.pending.complete(&key, ticket) else {
            self.stats.stale_completions += 1;
            tracing::debug!(asset_id = %asset_id, ticket = ticket.id, "stale texture load discarded");
            if let Ok(bitmap) = &result {
                self.loader.release(&asset_id, bitmap);
            }
            return CompletionOutcome::Stale(asset_id);
        };

        match result {
            Ok(bitmap) => {
                tracing::debug!(
                    asset_id = %asset_id,
                    width = bitmap.width(),
                    height = bitmap.height(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "texture loaded"
                );
                match self.set(asset_id.clone(), bitmap) {
                    Some(_) => CompletionOutcome::Loaded(asset_id),
                    None => {
                        self.record_failure(&asset_id, "texture exceeds the pool byte budget".to_string(), true);
                        CompletionOutcome::Failed(asset_id)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(asset_id = %asset_id, error = %e, "texture load failed");
                self.record_failure(&asset_id, e.to_string(), e.is_transient());
                CompletionOutcome::Failed(asset_id)
            }
        }
    }

    fn record_failure(&mut self, asset_id: &str, message: String, retryable: bool) {
        self.stats.loads_failed += 1;
        self.failures.insert(
            asset_id.to_string(),
            FailedLoad {
                message,
                failed_at: Instant::now(),
                retryable,
            },
        );
    }

    /// Clear retryable failure flags older than the retry delay.
    ///
    /// Returns the asset ids that will be fetched again on next request.
    pub fn retry_failed(&mut self, now: Instant) -> Vec<AssetId> {
        let delay = self.config.retry_delay;
        let due: Vec<AssetId> = self
            .failures
            .iter()
            .filter(|(_, f)| f.retryable && now.saturating_duration_since(f.failed_at) >= delay)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &due {
            self.failures.remove(id);
        }
        if !due.is_empty() {
            tracing::info!(count = due.len(), "retrying failed textures");
        }
        due
    }

    /// Clear every failure flag regardless of age.
    pub fn clear_failures(&mut self) -> usize {
        let count = self.failures.len();
        self.failures.clear();
        count
    }

    /// Evict the `count` least recently used entries.
    pub fn evict_lru(&mut self, count: usize) -> usize {
        if count == 0 || self.entries.is_empty() {
            return 0;
        }

        let mut by_age: Vec<(u64, AssetId)> = self
            .entries
            .values()
            .map(|e| (e.last_accessed, e.key.clone()))
            .collect();
        by_age.sort_unstable();

        let mut evicted = 0;
        for (_, key) in by_age.into_iter().take(count) {
            if let Some(entry) = self.entries.remove(&key) {
                self.bytes = self.bytes.saturating_sub(entry.byte_size);
                self.loader.release(&key, &entry.bitmap);
                self.stats.evictions += 1;
                evicted += 1;
                tracing::debug!(asset_id = %key, bytes = entry.byte_size, "texture evicted");
            }
        }
        evicted
    }

    /// Evict the configured fraction of entries, oldest first.
    pub fn evict_fraction(&mut self) -> usize {
        let count = fraction_of(self.entries.len(), self.config.eviction_fraction);
        self.evict_lru(count)
    }

    fn make_room(&mut self, incoming_bytes: usize) {
        let capacity = self.effective_capacity();
        if self.entries.len() >= capacity {
            let over = self.entries.len() + 1 - capacity;
            let count = fraction_of(self.entries.len(), self.config.eviction_fraction).max(over);
            self.evict_lru(count);
        }

        let budget = self.effective_byte_budget();
        while self.bytes + incoming_bytes > budget && !self.entries.is_empty() {
            self.evict_lru(1);
        }
    }

    /// Shrink to the current mode's caps without inserting anything.
    fn enforce_limits(&mut self) {
        let capacity = self.effective_capacity();
        if self.entries.len() > capacity {
            self.evict_lru(self.entries.len() - capacity);
        }
        let budget = self.effective_byte_budget();
        while self.bytes > budget && !self.entries.is_empty() {
            self.evict_lru(1);
        }
    }

    /// Switch mode and shrink to its caps.
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.enforce_limits();
        tracing::debug!(
            %mode,
            capacity = self.effective_capacity(),
            entries = self.entries.len(),
            "texture pool mode changed"
        );
    }

    /// Drop every entry and abandon in-flight loads.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        for (key, entry) in self.entries.drain() {
            self.loader.release(&key, &entry.bitmap);
        }
        self.stats.evictions += count as u64;
        self.bytes = 0;
        self.pending.clear();
        self.epoch += 1;
        tracing::info!(evicted = count, epoch = self.epoch, "texture pool cleared");
    }

    /// React to a performance bus event.
    pub fn handle_event(&mut self, event: &PerformanceEvent) {
        match event {
            PerformanceEvent::MemoryCleanup {
                severity: Severity::Critical,
            } => self.clear(),
            PerformanceEvent::MemoryCleanup {
                severity: Severity::Warning,
            } => {
                let evicted = self.evict_fraction();
                tracing::debug!(evicted, "memory cleanup (warning)");
            }
            PerformanceEvent::ModeChange { mode, .. } => self.set_mode(*mode),
            PerformanceEvent::MemoryCleanup {
                severity: Severity::Healthy,
            }
            | PerformanceEvent::OptimizeRendering { .. } => {}
        }
    }

    /// Release everything. Further requests fail.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.clear();
        self.failures.clear();
        self.shut_down = true;
        tracing::info!("texture pool shut down");
    }
}

impl Drop for TexturePool {
    fn drop(&mut self) {
        for (key, entry) in self.entries.drain() {
            self.loader.release(&key, &entry.bitmap);
        }
    }
}

fn scaled(value: usize, mode: PerformanceMode) -> usize {
    (value as f64 * mode.capacity_factor()).floor() as usize
}

/// `ceil(len * fraction)`, at least 1 for a non-empty pool.
fn fraction_of(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * fraction).ceil() as usize).clamp(1, len)
}

/// Convenience for tests and tools: load an asset through the pool and
/// wait for it.
pub async fn load_blocking(pool: &mut TexturePool, asset: &Asset) -> ClipdeckResult<Arc<DecodedBitmap>> {
    loop {
        match pool.request(asset) {
            TextureState::Ready(bitmap) => return Ok(bitmap),
            TextureState::Failed(message) => {
                return Err(ClipdeckError::asset_load(&asset.id, message))
            }
            TextureState::Loading => {
                pool.next_completion().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipdeck_timeline_model::asset::AssetType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Loader producing 10x10 bitmaps. Ids starting with "bad" fail
    /// transiently, "odd" permanently.
    #[derive(Default)]
    struct FakeLoader {
        loads: AtomicUsize,
        released: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextureLoader for FakeLoader {
        async fn load(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if asset.id.starts_with("bad") {
                return Err(ClipdeckError::asset_load(&asset.id, "404"));
            }
            if asset.id.starts_with("odd") {
                return Err(ClipdeckError::unsupported("no picture"));
            }
            Ok(DecodedBitmap::blank(10, 10))
        }

        fn release(&self, asset_id: &str, _bitmap: &DecodedBitmap) {
            self.released.lock().unwrap().push(asset_id.to_string());
        }
    }

    fn config(capacity: usize) -> TexturePoolConfig {
        TexturePoolConfig {
            capacity,
            byte_budget: usize::MAX / 2,
            eviction_fraction: 0.3,
            retry_delay: Duration::from_secs(5),
        }
    }

    fn pool(capacity: usize) -> (TexturePool, Arc<FakeLoader>) {
        let loader = Arc::new(FakeLoader::default());
        (TexturePool::new(config(capacity), loader.clone()), loader)
    }

    fn image(id: &str) -> Asset {
        Asset::new(id, AssetType::Image, format!("{id}.png"))
    }

    #[test]
    fn test_get_and_set() {
        let (mut pool, _) = pool(4);
        assert!(pool.get("a").is_none());
        pool.set("a", DecodedBitmap::blank(2, 2));
        assert!(pool.get("a").is_some());
        assert_eq!(pool.bytes(), 16);
        let stats = pool.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_set_is_idempotent_per_key() {
        let (mut pool, loader) = pool(4);
        pool.set("a", DecodedBitmap::blank(2, 2));
        pool.set("a", DecodedBitmap::blank(4, 4));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.bytes(), 64);
        assert_eq!(loader.released.lock().unwrap().as_slice(), ["a"]);
    }

    #[test]
    fn test_entry_cap_evicts_least_recent_first() {
        let (mut pool, loader) = pool(10);
        for i in 0..10 {
            pool.set(format!("t{i}"), DecodedBitmap::blank(1, 1));
        }
        // Touch the three oldest so they survive.
        for i in 0..3 {
            pool.get(&format!("t{i}"));
        }
        pool.set("t10", DecodedBitmap::blank(1, 1));

        // 30% of 10 evicted in one sweep.
        assert_eq!(pool.len(), 8);
        assert!(pool.contains("t0") && pool.contains("t1") && pool.contains("t2"));
        assert!(!pool.contains("t3") && !pool.contains("t4") && !pool.contains("t5"));
        assert_eq!(loader.released.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_byte_budget_evicts_until_fit() {
        let loader = Arc::new(FakeLoader::default());
        let mut pool = TexturePool::new(
            TexturePoolConfig {
                byte_budget: 1000,
                ..config(100)
            },
            loader,
        );
        pool.set("a", DecodedBitmap::blank(10, 10)); // 400 bytes
        pool.set("b", DecodedBitmap::blank(10, 10));
        pool.set("c", DecodedBitmap::blank(10, 10));
        assert!(pool.bytes() <= 1000);
        assert_eq!(pool.len(), 2);
        assert!(!pool.contains("a"));
    }

    #[test]
    fn test_oversize_bitmap_not_cached() {
        let loader = Arc::new(FakeLoader::default());
        let mut pool = TexturePool::new(
            TexturePoolConfig {
                byte_budget: 100,
                ..config(4)
            },
            loader,
        );
        assert!(pool.set("huge", DecodedBitmap::blank(100, 100)).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_mode_shrinks_capacity() {
        let (mut pool, _) = pool(20);
        for i in 0..20 {
            pool.set(format!("t{i}"), DecodedBitmap::blank(1, 1));
        }
        pool.set_mode(PerformanceMode::Minimal);
        assert_eq!(pool.effective_capacity(), 10);
        assert_eq!(pool.len(), 10);
        assert!(pool.contains("t19"));
        assert!(!pool.contains("t0"));
    }

    #[test]
    fn test_critical_cleanup_clears_everything() {
        let (mut pool, loader) = pool(20);
        for i in 0..5 {
            pool.set(format!("t{i}"), DecodedBitmap::blank(1, 1));
        }
        pool.handle_event(&PerformanceEvent::MemoryCleanup {
            severity: Severity::Critical,
        });
        assert!(pool.is_empty());
        assert_eq!(pool.bytes(), 0);
        assert_eq!(loader.released.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_warning_cleanup_evicts_fraction() {
        let (mut pool, _) = pool(20);
        for i in 0..10 {
            pool.set(format!("t{i}"), DecodedBitmap::blank(1, 1));
        }
        pool.handle_event(&PerformanceEvent::MemoryCleanup {
            severity: Severity::Warning,
        });
        assert_eq!(pool.len(), 7);
        assert!(!pool.contains("t0"));
    }

    #[tokio::test]
    async fn test_parallel_requests_share_one_load() {
        let (mut pool, loader) = pool(4);
        let asset = image("a");
        assert!(matches!(pool.request(&asset), TextureState::Loading));
        assert!(matches!(pool.request(&asset), TextureState::Loading));
        assert!(matches!(pool.request(&asset), TextureState::Loading));

        let outcome = pool.next_completion().await;
        assert_eq!(outcome, CompletionOutcome::Loaded("a".to_string()));
        assert!(matches!(pool.request(&asset), TextureState::Ready(_)));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().loads_joined, 2);
    }

    #[tokio::test]
    async fn test_evicted_key_fetches_exactly_once_more() {
        let (mut pool, loader) = pool(2);
        for id in ["a", "b", "c"] {
            load_blocking(&mut pool, &image(id)).await.unwrap();
        }
        assert!(pool.len() <= 2);
        assert!(!pool.contains("a"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);

        load_blocking(&mut pool, &image("a")).await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
        load_blocking(&mut pool, &image("a")).await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failure_is_cached_until_retry() {
        let (mut pool, loader) = pool(4);
        let asset = image("bad-1");
        pool.request(&asset);
        assert_eq!(
            pool.next_completion().await,
            CompletionOutcome::Failed("bad-1".to_string())
        );
        assert!(matches!(pool.request(&asset), TextureState::Failed(_)));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        // Not yet due.
        assert!(pool.retry_failed(Instant::now()).is_empty());
        let due = pool.retry_failed(Instant::now() + Duration::from_secs(6));
        assert_eq!(due, vec!["bad-1".to_string()]);
        assert!(matches!(pool.request(&asset), TextureState::Loading));
        pool.next_completion().await;
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let (mut pool, loader) = pool(4);
        let asset = image("odd-1");
        pool.request(&asset);
        pool.next_completion().await;

        assert!(pool.retry_failed(Instant::now() + Duration::from_secs(60)).is_empty());
        assert!(matches!(pool.request(&asset), TextureState::Failed(_)));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        assert_eq!(pool.clear_failures(), 1);
        assert!(matches!(pool.request(&asset), TextureState::Loading));
    }

    #[tokio::test]
    async fn test_completion_after_clear_is_stale() {
        let (mut pool, loader) = pool(4);
        let asset = image("a");
        pool.request(&asset);
        pool.clear();

        assert_eq!(
            pool.next_completion().await,
            CompletionOutcome::Stale("a".to_string())
        );
        assert!(!pool.contains("a"));
        assert_eq!(loader.released.lock().unwrap().as_slice(), ["a"]);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_requests() {
        let (mut pool, _) = pool(4);
        load_blocking(&mut pool, &image("a")).await.unwrap();
        pool.shutdown();
        assert!(pool.is_empty());
        assert!(matches!(pool.request(&image("a")), TextureState::Failed(_)));
    }

    #[test]
    fn test_request_without_runtime_fails_softly() {
        let (mut pool, _) = pool(4);
        assert!(matches!(pool.request(&image("a")), TextureState::Failed(_)));
        assert!(!pool.has_pending());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pool_never_exceeds_capacity(
                capacity in 1usize..16,
                keys in proptest::collection::vec(0u8..40, 1..120),
            ) {
                let (mut pool, _) = pool(capacity);
                for key in keys {
                    let key = format!("k{key}");
                    if pool.get(&key).is_none() {
                        pool.set(key, DecodedBitmap::blank(1, 1));
                    }
                    prop_assert!(pool.len() <= capacity);
                }
            }
        }
    }
}
