//! SCROLLPLAY - scroll-driven frame animation engine
//!
//! Re-exports all modules for use by the driver binary.

// Core engine (cache, preload, scroll mapping, story, render loop)
pub mod core;

pub mod cli;
pub mod config;
pub mod paths;

// Re-export commonly used types from core
pub use config::{AnimConfig, CachePolicy, ConfigError};
pub use core::player::{Phase, Player, PlayerError};
pub use core::story::{Overlay, StoryScript};
