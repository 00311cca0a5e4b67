//! Preloading: sliding window around the target frame + startup barrier
//!
//! `PreloadScheduler::schedule` runs every tick and is idempotent: frames
//! already in the cache (in any state) are skipped, so a repeated target issues
//! no new loads.
//!
//! `InitialLoad` is a join, not a race: it requests `[0, INITIAL_PRELOAD_COUNT)`
//! once at startup and only reports completion when every one of those frames
//! has settled, successfully or not.

use log::{debug, info};
use std::ops::RangeInclusive;

use super::cache::FrameCache;
use crate::config::AnimConfig;

/// Sliding preload window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadScheduler {
    ahead: usize,
    behind: usize,
    total_frames: usize,
}

impl PreloadScheduler {
    pub fn new(config: &AnimConfig) -> Self {
        Self {
            ahead: config.preload_ahead,
            behind: config.preload_behind,
            total_frames: config.total_frames(),
        }
    }

    /// `[max(0, target - behind), min(total - 1, target + ahead)]`
    pub fn window(&self, target: usize) -> RangeInclusive<usize> {
        let last = self.total_frames.saturating_sub(1);
        let target = target.min(last);
        target.saturating_sub(self.behind)..=target.saturating_add(self.ahead).min(last)
    }

    /// Ensure every frame in the window around `target`.
    ///
    /// Returns the number of loads issued.
    pub fn schedule(&self, target: usize, cache: &mut FrameCache) -> usize {
        let mut issued = 0;
        for frame in self.window(target) {
            if !cache.has(frame) && cache.ensure(frame) {
                issued += 1;
            }
        }
        if issued > 0 {
            debug!("Preload around {}: {} loads issued", target, issued);
        }
        issued
    }
}

/// Startup barrier over the first frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialLoad {
    total: usize,
    settled: usize,
}

impl InitialLoad {
    /// Request `[0, initial_frames)` and start waiting on them
    pub fn start(config: &AnimConfig, cache: &mut FrameCache) -> Self {
        let total = config.initial_frames();
        for frame in 0..total {
            cache.ensure(frame);
        }
        info!("Initial load: waiting for {} frames", total);
        let mut barrier = Self { total, settled: 0 };
        barrier.observe(cache);
        barrier
    }

    /// Recount settled frames. Returns `true` once all of them have settled.
    pub fn observe(&mut self, cache: &FrameCache) -> bool {
        if self.is_complete() {
            return true;
        }
        self.settled = (0..self.total).filter(|&frame| cache.is_settled(frame)).count();
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.settled == self.total
    }

    /// (settled, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.settled, self.total)
    }
}
