//! Render loop scheduling: an explicit, cancellable per-refresh task
//!
//! **Why**: A tick that reschedules itself forever must be stoppable
//! deterministically on teardown, not whenever its closure happens to be dropped.
//!
//! `RenderLoop::start` hands out a `TickHandle`. The loop only reports a due
//! tick while the handle is alive and not cancelled; dropping the handle
//! cancels. The host calls `poll(now)` on every display refresh and
//! `reschedule(now)` after running the tick. Rescheduling is relative to the
//! time the tick ran, so slow refreshes never build a backlog of ticks.

use log::{debug, trace};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::story::Overlay;

/// Default refresh interval (60 Hz)
pub const DEFAULT_REFRESH: Duration = Duration::from_micros(16_667);

/// Cancel handle for a running render loop
#[derive(Debug)]
pub struct TickHandle {
    active: Rc<Cell<bool>>,
}

impl TickHandle {
    pub fn cancel(&self) {
        if self.active.replace(false) {
            debug!("Render loop cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Self-rescheduling tick
#[derive(Debug)]
pub struct RenderLoop {
    interval: Duration,
    next_due: Option<Instant>,
    active: Option<Rc<Cell<bool>>>,
    ticks: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH)
    }
}

impl RenderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            active: None,
            ticks: 0,
        }
    }

    /// Start ticking; the first tick is due at `now`.
    ///
    /// Starting again replaces (and cancels) any previous schedule.
    pub fn start(&mut self, now: Instant) -> TickHandle {
        if let Some(old) = self.active.take() {
            old.set(false);
        }
        let active = Rc::new(Cell::new(true));
        self.active = Some(Rc::clone(&active));
        self.next_due = Some(now);
        debug!("Render loop started ({:?} interval)", self.interval);
        TickHandle { active }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.get())
    }

    /// Consume the schedule if a tick is due at `now`.
    ///
    /// After cancellation this clears the schedule and never fires again.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.is_running() {
            if self.active.take().is_some() {
                self.next_due = None;
                trace!("Render loop released after {} ticks", self.ticks);
            }
            return false;
        }
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = None;
                self.ticks += 1;
                true
            }
            _ => false,
        }
    }

    /// Schedule the next tick one interval after `now`
    pub fn reschedule(&mut self, now: Instant) {
        if self.is_running() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Target frame read at the start of the tick
    pub frame: usize,
    /// The canvas was repainted
    pub drew: bool,
    /// New overlay state, if it changed
    pub overlay: Option<Overlay>,
    /// Loads issued by the preload scheduler
    pub loads_issued: usize,
    /// Entries dropped by a bounded cache
    pub evicted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_due_immediately() {
        let mut render_loop = RenderLoop::new(Duration::from_millis(10));
        let t0 = Instant::now();
        assert!(!render_loop.poll(t0));

        let _handle = render_loop.start(t0);
        assert!(render_loop.poll(t0));
        assert!(!render_loop.poll(t0)); // consumed until rescheduled
        assert_eq!(render_loop.ticks(), 1);
    }

    #[test]
    fn test_reschedule_from_tick_time() {
        let mut render_loop = RenderLoop::new(Duration::from_millis(10));
        let t0 = Instant::now();
        let _handle = render_loop.start(t0);
        assert!(render_loop.poll(t0));

        // Tick ran late; next one is relative to when it ran, no catch-up burst
        let late = t0 + Duration::from_millis(95);
        render_loop.reschedule(late);
        assert!(!render_loop.poll(late + Duration::from_millis(5)));
        assert!(render_loop.poll(late + Duration::from_millis(10)));
        assert!(!render_loop.poll(late + Duration::from_millis(11)));
    }

    #[test]
    fn test_cancel_stops_ticks() {
        let mut render_loop = RenderLoop::new(Duration::from_millis(10));
        let t0 = Instant::now();
        let handle = render_loop.start(t0);

        handle.cancel();
        assert!(!handle.is_active());
        assert!(!render_loop.poll(t0 + Duration::from_secs(1)));
        render_loop.reschedule(t0);
        assert_eq!(render_loop.next_due(), None);
    }

    #[test]
    fn test_drop_handle_cancels() {
        let mut render_loop = RenderLoop::default();
        let t0 = Instant::now();
        {
            let _handle = render_loop.start(t0);
            assert!(render_loop.is_running());
        }
        assert!(!render_loop.is_running());
        assert!(!render_loop.poll(t0));
    }

    #[test]
    fn test_restart_cancels_previous_handle() {
        let mut render_loop = RenderLoop::default();
        let t0 = Instant::now();
        let first = render_loop.start(t0);
        let second = render_loop.start(t0);
        assert!(!first.is_active());
        assert!(second.is_active());
        assert!(render_loop.poll(t0));
    }
}
