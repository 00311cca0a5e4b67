//! Scroll-driven player: the single owner of all animation state
//!
//! **Architecture**: `Player` owns the target frame, the canvas (and its last
//! drawn frame), the cache, the overlay state and the render loop. Host events
//! and ticks both take `&mut Player`, so nothing is shared and nothing needs a
//! lock. Frame loads run elsewhere but only report back through the cache's
//! completion channel, applied here at the start of each refresh.
//!
//! # Lifecycle
//!
//! 1. `new()` validates the config and requests the initial frames
//! 2. `Loading` until every initial frame has settled (ready or failed)
//! 3. The first `refresh()` after that starts the render loop
//! 4. `teardown()` cancels the loop and releases the host listeners
//!
//! # Tick order
//!
//! read target -> overlay -> draw -> preload (-> bounded eviction) -> reschedule

use log::{debug, info, trace};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::FrameCache;
use super::canvas::{FrameCanvas, Surface};
use super::host::{EventKind, HostBus, HostEvent, Listener};
use super::preload::{InitialLoad, PreloadScheduler};
use super::render_loop::{RenderLoop, TickHandle, TickReport};
use super::scroll::{ScrollMapper, ViewportMetrics};
use super::source::FrameSource;
use super::story::{Overlay, OverlayMachine, StoryScript};
use super::workers::WorkerPool;
use crate::config::{AnimConfig, ConfigError};

/// Player lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting at the initial-load barrier
    Loading { settled: usize, total: usize },
    /// Barrier passed, loop not started yet
    Ready,
    Running,
    TornDown,
}

/// Player errors
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerError {
    Config(ConfigError),
    LoadTimeout { settled: usize, total: usize },
    TornDown,
}

impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerError::Config(e) => write!(f, "Invalid config: {}", e),
            PlayerError::LoadTimeout { settled, total } => write!(
                f,
                "Initial load timed out: {}/{} frames settled",
                settled, total
            ),
            PlayerError::TornDown => write!(f, "Player was torn down"),
        }
    }
}

impl std::error::Error for PlayerError {}

impl From<ConfigError> for PlayerError {
    fn from(e: ConfigError) -> Self {
        PlayerError::Config(e)
    }
}

pub struct Player<S> {
    config: AnimConfig,
    cache: FrameCache,
    preloader: PreloadScheduler,
    initial: InitialLoad,
    mapper: ScrollMapper,
    script: StoryScript,
    overlay: OverlayMachine,
    canvas: FrameCanvas<S>,
    render_loop: RenderLoop,
    tick_handle: Option<TickHandle>,
    listener: Option<Listener>,
    /// Latest frame the scroll position maps to
    target_frame: usize,
    viewport: Option<ViewportMetrics>,
    torn_down: bool,
}

impl<S: Surface> Player<S> {
    /// Validate `config` and start the initial load
    pub fn new(
        config: AnimConfig,
        script: StoryScript,
        source: Arc<dyn FrameSource>,
        pool: Arc<dyn WorkerPool>,
    ) -> Result<Self, PlayerError> {
        config.validate()?;

        let mut cache = FrameCache::new(&config, source, pool);
        let initial = InitialLoad::start(&config, &mut cache);

        info!(
            "Player created: {} frames ({} x {}), {} triggers",
            config.total_frames(),
            config.sequence_count,
            config.frames_per_sequence,
            script.len()
        );

        Ok(Self {
            preloader: PreloadScheduler::new(&config),
            mapper: ScrollMapper::new(config.total_frames()),
            config,
            cache,
            initial,
            script,
            overlay: OverlayMachine::new(),
            canvas: FrameCanvas::new(),
            render_loop: RenderLoop::default(),
            tick_handle: None,
            listener: None,
            target_frame: 0,
            viewport: None,
            torn_down: false,
        })
    }

    /// Use a refresh interval other than 60 Hz
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.render_loop = RenderLoop::new(interval);
        self
    }

    /// Attach the render surface, sized to the last known viewport
    pub fn attach_surface(&mut self, surface: S) {
        if self.torn_down {
            return;
        }
        self.canvas.attach(surface);
        if let Some(viewport) = self.viewport {
            self.canvas.resize(viewport.viewport_width, viewport.viewport_height);
        }
    }

    /// Give the surface back to the host
    pub fn take_surface(&mut self) -> Option<S> {
        self.canvas.detach()
    }

    /// Subscribe to the host's scroll and resize notifications
    pub fn listen(&mut self, bus: &HostBus) {
        if self.torn_down {
            return;
        }
        self.listener = Some(bus.listen(&[EventKind::Scroll, EventKind::Resize]));
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        if self.torn_down {
            return;
        }
        match event {
            HostEvent::Scroll(metrics) => self.on_scroll(metrics),
            HostEvent::Resize(metrics) => self.on_resize(metrics),
        }
    }

    fn on_scroll(&mut self, metrics: ViewportMetrics) {
        self.viewport = Some(metrics);
        if self.mapper.update(&metrics, &mut self.target_frame) {
            trace!("Scroll {:.1} -> frame {}", metrics.scroll_y, self.target_frame);
        }
    }

    fn on_resize(&mut self, metrics: ViewportMetrics) {
        debug!(
            "Resize: {}x{}, document {:.0}",
            metrics.viewport_width, metrics.viewport_height, metrics.document_height
        );
        self.viewport = Some(metrics);
        self.canvas.resize(metrics.viewport_width, metrics.viewport_height);
        self.mapper.update(&metrics, &mut self.target_frame);
    }

    /// Apply finished loads and re-check the initial-load barrier
    pub fn poll_loading(&mut self) -> Phase {
        if self.torn_down {
            return Phase::TornDown;
        }
        self.cache.pump();
        if !self.initial.is_complete() && self.initial.observe(&self.cache) {
            info!(
                "Initial load complete: {} frames ({} failed)",
                self.initial.progress().1,
                self.cache.stats().failures()
            );
        }
        self.phase()
    }

    /// Block until the initial-load barrier passes or `timeout` expires
    pub fn wait_for_loading(&mut self, timeout: Duration) -> Result<(), PlayerError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.poll_loading() {
                Phase::TornDown => return Err(PlayerError::TornDown),
                Phase::Loading { settled, total } => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PlayerError::LoadTimeout { settled, total });
                    }
                    self.cache.wait_for_completion(deadline - now);
                }
                Phase::Ready | Phase::Running => return Ok(()),
            }
        }
    }

    /// Display refresh callback.
    ///
    /// Drains host events, applies finished loads, starts the loop once the
    /// barrier has passed, and runs a tick if one is due.
    pub fn refresh(&mut self, now: Instant) -> Option<TickReport> {
        if self.torn_down {
            return None;
        }

        let events = self.listener.as_ref().map(Listener::drain).unwrap_or_default();
        for event in events {
            self.handle_event(event);
        }

        if let Phase::Loading { .. } = self.poll_loading() {
            return None;
        }
        if self.tick_handle.is_none() {
            self.tick_handle = Some(self.render_loop.start(now));
            info!("Render loop running at frame {}", self.target_frame);
        }

        if !self.render_loop.poll(now) {
            return None;
        }
        let report = self.tick();
        self.render_loop.reschedule(now);
        Some(report)
    }

    fn tick(&mut self) -> TickReport {
        let frame = self.target_frame;
        let overlay = self.overlay.evaluate(&self.script, frame).cloned();
        let drew = self.canvas.draw(frame, &self.cache);
        let loads_issued = self.preloader.schedule(frame, &mut self.cache);
        let window = self.preloader.window(frame);
        let evicted = self.cache.enforce_capacity(frame, &window);

        trace!(
            "Tick: frame={} drew={} loads={} evicted={}",
            frame, drew, loads_issued, evicted
        );
        TickReport {
            frame,
            drew,
            overlay,
            loads_issued,
            evicted,
        }
    }

    /// Stop ticking and release host listeners. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(handle) = self.tick_handle.take() {
            handle.cancel();
        }
        self.listener = None;
        info!(
            "Player torn down after {} ticks ({} frames cached, {} failed)",
            self.render_loop.ticks(),
            self.cache.len(),
            self.cache.stats().failures()
        );
    }

    pub fn phase(&self) -> Phase {
        if self.torn_down {
            Phase::TornDown
        } else if !self.initial.is_complete() {
            let (settled, total) = self.initial.progress();
            Phase::Loading { settled, total }
        } else if self.render_loop.is_running() {
            Phase::Running
        } else {
            Phase::Ready
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase(), Phase::Loading { .. })
    }

    pub fn target_frame(&self) -> usize {
        self.target_frame
    }

    pub fn last_drawn(&self) -> Option<usize> {
        self.canvas.last_drawn()
    }

    pub fn overlay(&self) -> &Overlay {
        self.overlay.current()
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn surface(&self) -> Option<&S> {
        self.canvas.surface()
    }

    pub fn config(&self) -> &AnimConfig {
        &self.config
    }

    pub fn script(&self) -> &StoryScript {
        &self.script
    }

    /// Next time a tick is due, if the loop is running
    pub fn next_tick_due(&self) -> Option<Instant> {
        self.render_loop.next_due()
    }
}
