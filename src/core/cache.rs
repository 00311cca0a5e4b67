//! Frame cache: frame index -> pending / ready / failed entry
//!
//! Entries are created lazily by `ensure()`, which issues exactly one
//! asynchronous load per frame. Loads run on a `WorkerPool`; their results come
//! back over a channel and are applied by `pump()` on the owning thread, so the
//! entry map itself is never shared and needs no lock.
//!
//! Retention: `CachePolicy::Unbounded` never evicts (the reference sequence is
//! small enough to hold entirely). `CachePolicy::Bounded` drops ready frames
//! farthest from the target once the entry count exceeds the capacity. Pending
//! and failed entries are never evicted, so failed frames are never retried.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, trace, warn};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::addressing::locate;
use super::frame::{FrameError, FrameImage, FrameStatus};
use super::source::FrameSource;
use super::workers::WorkerPool;
use crate::config::{AnimConfig, CachePolicy};

/// One cache slot
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Pending,
    Ready(FrameImage),
    Failed,
}

impl CacheEntry {
    pub fn status(&self) -> FrameStatus {
        match self {
            CacheEntry::Pending => FrameStatus::Pending,
            CacheEntry::Ready(_) => FrameStatus::Ready,
            CacheEntry::Failed => FrameStatus::Failed,
        }
    }
}

/// Result of a single load, delivered back to the cache owner
struct LoadCompletion {
    frame: usize,
    result: Result<FrameImage, FrameError>,
}

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Loads issued (one per `ensure` that created an entry)
    pub fn loads_issued(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }
}

/// Lazily populated frame cache
pub struct FrameCache {
    config: AnimConfig,
    entries: HashMap<usize, CacheEntry>,
    source: Arc<dyn FrameSource>,
    pool: Arc<dyn WorkerPool>,
    completions_tx: Sender<LoadCompletion>,
    completions_rx: Receiver<LoadCompletion>,
    pending: usize,
    stats: CacheStats,
}

impl FrameCache {
    pub fn new(config: &AnimConfig, source: Arc<dyn FrameSource>, pool: Arc<dyn WorkerPool>) -> Self {
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        debug!(
            "FrameCache created: {} frames addressable, policy={:?}",
            config.total_frames(),
            config.cache_policy
        );
        Self {
            config: config.clone(),
            entries: HashMap::new(),
            source,
            pool,
            completions_tx,
            completions_rx,
            pending: 0,
            stats: CacheStats::default(),
        }
    }

    /// Entry exists in any state
    pub fn has(&self, frame: usize) -> bool {
        self.entries.contains_key(&frame)
    }

    /// Make sure a load has been issued for `frame`.
    ///
    /// Returns `true` if this call issued a new load. Out-of-range frames and
    /// frames already cached (pending, ready or failed) issue nothing.
    pub fn ensure(&mut self, frame: usize) -> bool {
        if self.has(frame) {
            return false;
        }
        let Some(locator) = locate(frame, &self.config) else {
            trace!("ensure({}): out of range, ignored", frame);
            return false;
        };

        self.entries.insert(frame, CacheEntry::Pending);
        self.pending += 1;
        self.stats.record_load();
        trace!("Loading frame {} from {}", frame, self.source.describe(&locator));

        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        self.pool.execute(Box::new(move || {
            let result = source.fetch(&locator);
            // Receiver lives as long as the cache; a send error means it is gone
            let _ = tx.send(LoadCompletion { frame, result });
        }));
        true
    }

    /// Decoded frame, only when ready
    pub fn get(&self, frame: usize) -> Option<&FrameImage> {
        match self.entries.get(&frame) {
            Some(CacheEntry::Ready(image)) => {
                self.stats.record_hit();
                Some(image)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn status(&self, frame: usize) -> Option<FrameStatus> {
        self.entries.get(&frame).map(CacheEntry::status)
    }

    /// Ready or failed
    pub fn is_settled(&self, frame: usize) -> bool {
        self.status(frame).is_some_and(FrameStatus::is_settled)
    }

    /// Apply every completion that has arrived so far. Never blocks.
    ///
    /// Returns the number of entries that settled.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until one completion arrives (or `timeout` passes) and apply it.
    ///
    /// Returns the settled frame, or `None` on timeout or when nothing is pending.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> Option<usize> {
        if self.pending == 0 {
            return None;
        }
        let completion = self.completions_rx.recv_timeout(timeout).ok()?;
        let frame = completion.frame;
        self.apply(completion).then_some(frame)
    }

    fn apply(&mut self, completion: LoadCompletion) -> bool {
        let LoadCompletion { frame, result } = completion;
        let Some(entry) = self.entries.get_mut(&frame) else {
            debug!("Dropping completion for uncached frame {}", frame);
            return false;
        };
        if !matches!(entry, CacheEntry::Pending) {
            return false;
        }

        self.pending = self.pending.saturating_sub(1);
        match result {
            Ok(image) => {
                trace!("Frame {} ready: {}x{}", frame, image.width(), image.height());
                *entry = CacheEntry::Ready(image);
            }
            Err(e) => {
                warn!("Frame {} failed to load: {}", frame, e);
                self.stats.record_failure();
                *entry = CacheEntry::Failed;
            }
        }
        true
    }

    /// Apply the bounded policy around `target`, never touching `keep`.
    ///
    /// Returns the number of evicted entries (always 0 when unbounded).
    pub fn enforce_capacity(&mut self, target: usize, keep: &RangeInclusive<usize>) -> usize {
        let CachePolicy::Bounded { capacity } = self.config.cache_policy else {
            return 0;
        };
        if self.entries.len() <= capacity {
            return 0;
        }

        let mut candidates: Vec<usize> = self
            .entries
            .iter()
            .filter(|(frame, entry)| matches!(entry, CacheEntry::Ready(_)) && !keep.contains(*frame))
            .map(|(frame, _)| *frame)
            .collect();
        candidates.sort_unstable_by_key(|frame| (Reverse(frame.abs_diff(target)), *frame));

        let excess = self.entries.len() - capacity;
        let mut evicted = 0;
        for frame in candidates.into_iter().take(excess) {
            self.entries.remove(&frame);
            evicted += 1;
        }

        if evicted > 0 {
            self.stats.record_evictions(evicted as u64);
            debug!(
                "Evicted {} frames around target {} ({} entries left)",
                evicted,
                target,
                self.entries.len()
            );
        }
        evicted
    }

    /// Entries in any state
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads issued but not yet settled
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Memory held by ready frames in bytes
    pub fn mem(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                CacheEntry::Ready(image) => image.mem(),
                _ => 0,
            })
            .sum()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{ManualPool, ScriptedSource};
    use crate::core::workers::InlinePool;

    fn small_config() -> AnimConfig {
        AnimConfig {
            sequence_count: 2,
            frames_per_sequence: 10,
            initial_preload_count: 4,
            preload_ahead: 2,
            preload_behind: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_ensure_twice_issues_one_load() {
        let source = Arc::new(ScriptedSource::new(10));
        let pool = Arc::new(ManualPool::default());
        let mut cache = FrameCache::new(&small_config(), source.clone(), pool.clone());

        assert!(cache.ensure(3));
        assert!(!cache.ensure(3));
        assert_eq!(pool.queued(), 1);
        assert_eq!(cache.status(3), Some(FrameStatus::Pending));
        assert!(cache.get(3).is_none());

        pool.run_all();
        assert!(!cache.ensure(3)); // still not applied, still cached
        assert_eq!(cache.pump(), 1);
        assert_eq!(cache.status(3), Some(FrameStatus::Ready));
        assert_eq!(source.fetch_count(3), 1);
        assert_eq!(cache.stats().loads_issued(), 1);
    }

    #[test]
    fn test_failed_frame_is_never_retried() {
        let source = Arc::new(ScriptedSource::new(10).failing([5]));
        let mut cache = FrameCache::new(&small_config(), source.clone(), Arc::new(InlinePool));

        assert!(cache.ensure(5));
        cache.pump();
        assert_eq!(cache.status(5), Some(FrameStatus::Failed));
        assert!(cache.is_settled(5));
        assert!(cache.get(5).is_none());

        assert!(!cache.ensure(5));
        cache.pump();
        assert_eq!(source.fetch_count(5), 1);
        assert_eq!(cache.stats().failures(), 1);
    }

    #[test]
    fn test_out_of_range_issues_nothing() {
        let source = Arc::new(ScriptedSource::new(10));
        let mut cache = FrameCache::new(&small_config(), source.clone(), Arc::new(InlinePool));
        assert!(!cache.ensure(20));
        assert!(!cache.has(20));
        assert!(cache.is_empty());
        assert_eq!(source.total_fetches(), 0);
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let source = Arc::new(ScriptedSource::new(10));
        let mut cache = FrameCache::new(&small_config(), source, Arc::new(InlinePool));
        cache.ensure(0);
        cache.pump();

        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_rate(), 0.5);
        assert!(cache.mem() > 0);
    }

    #[test]
    fn test_wait_for_completion() {
        let source = Arc::new(ScriptedSource::new(10));
        let mut cache = FrameCache::new(&small_config(), source, Arc::new(InlinePool));
        assert_eq!(cache.wait_for_completion(Duration::from_millis(1)), None);

        cache.ensure(2);
        assert_eq!(cache.pending_count(), 1);
        assert_eq!(cache.wait_for_completion(Duration::from_secs(1)), Some(2));
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let source = Arc::new(ScriptedSource::new(10));
        let mut cache = FrameCache::new(&small_config(), source, Arc::new(InlinePool));
        for frame in 0..20 {
            cache.ensure(frame);
        }
        cache.pump();
        assert_eq!(cache.enforce_capacity(19, &(18..=19)), 0);
        assert_eq!(cache.len(), 20);
    }

    #[test]
    fn test_bounded_evicts_farthest_ready_frames() {
        let config = AnimConfig {
            cache_policy: CachePolicy::Bounded { capacity: 6 },
            ..small_config()
        };
        let source = Arc::new(ScriptedSource::new(10).failing([0]));
        let mut cache = FrameCache::new(&config, source, Arc::new(InlinePool));
        for frame in 0..10 {
            cache.ensure(frame);
        }
        cache.pump();

        let evicted = cache.enforce_capacity(9, &(8..=9));
        assert_eq!(evicted, 4);
        assert_eq!(cache.len(), 6);
        // Failed frame 0 is kept so it is never retried; 1..=4 go first
        assert_eq!(cache.status(0), Some(FrameStatus::Failed));
        for frame in 1..=4 {
            assert!(!cache.has(frame), "frame {} should be evicted", frame);
        }
        for frame in 5..=9 {
            assert!(cache.has(frame));
        }
        assert_eq!(cache.stats().evictions(), 4);
    }
}
