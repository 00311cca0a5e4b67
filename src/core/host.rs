//! Host signal bus: scroll/resize notifications from the embedding page/window
//!
//! Architecture:
//! - The host calls `emit()` whenever the viewport scrolls or resizes
//! - Each `Listener` has its own queue; `drain()` returns its events in emit order,
//!   across all the kinds it listens to
//! - Events are viewport snapshots, so a queue holds at most one per kind: a new
//!   event replaces the queued one of its kind and moves to the back
//! - Dropping a `Listener` unregisters it; later events are not queued for it
//!
//! Events are queued, never delivered by callback, so handlers run on the
//! player's own timeline between ticks.

use log::trace;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::scroll::ViewportMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Scroll,
    Resize,
}

/// Viewport notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Scroll(ViewportMetrics),
    Resize(ViewportMetrics),
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Scroll(_) => EventKind::Scroll,
            HostEvent::Resize(_) => EventKind::Resize,
        }
    }

    pub fn metrics(&self) -> &ViewportMetrics {
        match self {
            HostEvent::Scroll(m) | HostEvent::Resize(m) => m,
        }
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    queues: HashMap<u64, (Vec<EventKind>, VecDeque<HostEvent>)>,
}

/// Shared bus between the host and its listeners
#[derive(Clone, Default)]
pub struct HostBus {
    inner: Arc<Mutex<BusInner>>,
}

impl HostBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for the given event kinds
    pub fn listen(&self, kinds: &[EventKind]) -> Listener {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.queues.insert(id, (kinds.to_vec(), VecDeque::new()));
        trace!("Host listener {} registered for {:?}", id, kinds);
        Listener {
            id,
            bus: self.clone(),
        }
    }

    /// Queue `event` for every listener of its kind, superseding the one
    /// already queued for that kind
    pub fn emit(&self, event: HostEvent) {
        let kind = event.kind();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for (id, (kinds, queue)) in inner.queues.iter_mut() {
            if !kinds.contains(&kind) {
                continue;
            }
            if let Some(pos) = queue.iter().position(|queued| queued.kind() == kind) {
                trace!("Host listener {}: {:?} superseded", id, kind);
                queue.remove(pos);
            }
            queue.push_back(event);
        }
    }

    /// Registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).queues.len()
    }

    fn drain(&self, id: u64) -> Vec<HostEvent> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .queues
            .get_mut(&id)
            .map(|(_, queue)| queue.drain(..).collect())
            .unwrap_or_default()
    }

    fn unlisten(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.queues.remove(&id).is_some() {
            trace!("Host listener {} released", id);
        }
    }
}

/// Registration on a `HostBus`; unregisters on drop
pub struct Listener {
    id: u64,
    bus: HostBus,
}

impl Listener {
    /// Take all queued events, oldest first
    pub fn drain(&self) -> Vec<HostEvent> {
        self.bus.drain(self.id)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.bus.unlisten(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_y: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_y,
            viewport_width: 800,
            viewport_height: 600,
            document_height: 6000.0,
        }
    }

    #[test]
    fn test_events_routed_by_kind() {
        let bus = HostBus::new();
        let scroll = bus.listen(&[EventKind::Scroll]);
        let resize = bus.listen(&[EventKind::Resize]);
        let both = bus.listen(&[EventKind::Scroll, EventKind::Resize]);

        bus.emit(HostEvent::Scroll(metrics(10.0)));
        bus.emit(HostEvent::Resize(metrics(0.0)));

        assert_eq!(scroll.drain(), vec![HostEvent::Scroll(metrics(10.0))]);
        assert_eq!(resize.drain(), vec![HostEvent::Resize(metrics(0.0))]);
        assert!(scroll.drain().is_empty());

        let kinds: Vec<EventKind> = both.drain().iter().map(HostEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Scroll, EventKind::Resize]);
    }

    #[test]
    fn test_drop_unregisters() {
        let bus = HostBus::new();
        let listener = bus.listen(&[EventKind::Scroll]);
        assert_eq!(bus.listener_count(), 1);
        drop(listener);
        assert_eq!(bus.listener_count(), 0);
        // Nobody listening: nothing is retained
        bus.emit(HostEvent::Scroll(metrics(1.0)));
        assert_eq!(bus.listener_count(), 0);
    }

    /// Test: a resize followed by a long burst of scrolls
    /// Validates: the resize survives, only the latest scroll is kept
    #[test]
    fn test_burst_keeps_latest_per_kind() {
        let bus = HostBus::new();
        let listener = bus.listen(&[EventKind::Scroll, EventKind::Resize]);

        bus.emit(HostEvent::Resize(metrics(0.0)));
        for i in 0..1000 {
            bus.emit(HostEvent::Scroll(metrics(i as f64)));
        }

        let events = listener.drain();
        assert_eq!(
            events,
            vec![HostEvent::Resize(metrics(0.0)), HostEvent::Scroll(metrics(999.0))]
        );
    }

    #[test]
    fn test_superseded_event_moves_to_back() {
        let bus = HostBus::new();
        let listener = bus.listen(&[EventKind::Scroll, EventKind::Resize]);

        bus.emit(HostEvent::Resize(metrics(0.0)));
        bus.emit(HostEvent::Scroll(metrics(5.0)));
        bus.emit(HostEvent::Resize(metrics(7.0)));

        // The later resize was emitted after the scroll and is handled after it
        assert_eq!(
            listener.drain(),
            vec![HostEvent::Scroll(metrics(5.0)), HostEvent::Resize(metrics(7.0))]
        );
    }
}
