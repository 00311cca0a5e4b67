//! Core engine modules - addressing, cache, preload, scroll, story, render loop
//!
//! These modules form the animation engine, independent of any host window.

pub mod addressing;
pub mod cache;
pub mod canvas;
pub mod frame;
pub mod host;
pub mod player;
pub mod preload;
pub mod render_loop;
pub mod scroll;
pub mod source;
pub mod story;
pub mod workers;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use addressing::{locate, Locator};
pub use cache::{CacheEntry, CacheStats, FrameCache};
pub use canvas::{cover_crop, FrameCanvas, PixelSurface, SourceRect, Surface};
pub use frame::{FrameError, FrameImage, FrameStatus};
pub use host::{EventKind, HostBus, HostEvent, Listener};
pub use player::{Phase, Player, PlayerError};
pub use preload::{InitialLoad, PreloadScheduler};
pub use render_loop::{RenderLoop, TickHandle, TickReport};
pub use scroll::{ScrollMapper, ViewportMetrics};
pub use source::{DirSource, FrameSource};
pub use story::{Overlay, OverlayMachine, SceneDescriptor, ScriptError, StoryScript, TriggerPoint};
pub use workers::{InlinePool, WorkerPool, Workers};
