//! Animation constants and the runtime view of them.
//!
//! The reference sizing is fixed at build time. `AnimConfig::default()` mirrors the
//! constants below; other values only exist for tests and for the optional cache bound.

use serde::{Deserialize, Serialize};

/// Number of independently numbered frame sequences
pub const SEQUENCE_COUNT: usize = 6;
/// Frames in each sequence
pub const FRAMES_PER_SEQUENCE: usize = 192;
/// Frames across all sequences
pub const TOTAL_FRAMES: usize = SEQUENCE_COUNT * FRAMES_PER_SEQUENCE;
/// Page height per frame in CSS pixels (controls scroll "speed")
pub const SCROLL_HEIGHT_PER_FRAME: f64 = 10.0;
/// Frames after a trigger during which its balloon stays visible
pub const BALLOON_VISIBILITY_WINDOW: usize = 50;
/// Frames loaded before the first draw
pub const INITIAL_PRELOAD_COUNT: usize = 60;
/// Preload window size in front of the target frame
pub const PRELOAD_AHEAD: usize = 30;
/// Preload window size behind the target frame
pub const PRELOAD_BEHIND: usize = 10;
/// Digits of the zero-padded in-sequence index used by the file server
pub const FRAME_PAD_WIDTH: usize = 3;

/// Cache retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Keep every frame ever requested (reference behavior)
    #[default]
    Unbounded,
    /// Keep at most `capacity` entries, evicting settled frames farthest from the target
    Bounded { capacity: usize },
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptySequence,
    InvalidScrollHeight(f64),
    CapacityBelowWindow { capacity: usize, window: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptySequence => {
                write!(f, "sequence_count and frames_per_sequence must be non-zero")
            }
            ConfigError::InvalidScrollHeight(h) => {
                write!(f, "scroll_height_per_frame must be finite and positive, got {}", h)
            }
            ConfigError::CapacityBelowWindow { capacity, window } => write!(
                f,
                "cache capacity {} is smaller than the preload window ({} frames)",
                capacity, window
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Animation sizing, preload and cache settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimConfig {
    pub sequence_count: usize,
    pub frames_per_sequence: usize,
    pub scroll_height_per_frame: f64,
    pub balloon_visibility_window: usize,
    pub initial_preload_count: usize,
    pub preload_ahead: usize,
    pub preload_behind: usize,
    pub cache_policy: CachePolicy,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            sequence_count: SEQUENCE_COUNT,
            frames_per_sequence: FRAMES_PER_SEQUENCE,
            scroll_height_per_frame: SCROLL_HEIGHT_PER_FRAME,
            balloon_visibility_window: BALLOON_VISIBILITY_WINDOW,
            initial_preload_count: INITIAL_PRELOAD_COUNT,
            preload_ahead: PRELOAD_AHEAD,
            preload_behind: PRELOAD_BEHIND,
            cache_policy: CachePolicy::Unbounded,
        }
    }
}

impl AnimConfig {
    pub fn total_frames(&self) -> usize {
        self.sequence_count * self.frames_per_sequence
    }

    /// Height of the scroll container in CSS pixels
    pub fn page_height(&self) -> f64 {
        self.total_frames() as f64 * self.scroll_height_per_frame
    }

    /// Frames fetched before the loop starts, never more than exist
    pub fn initial_frames(&self) -> usize {
        self.initial_preload_count.min(self.total_frames())
    }

    /// Largest number of frames the preload window can cover
    pub fn window_len(&self) -> usize {
        (self.preload_behind + self.preload_ahead + 1).min(self.total_frames())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_frames() == 0 {
            return Err(ConfigError::EmptySequence);
        }
        if !self.scroll_height_per_frame.is_finite() || self.scroll_height_per_frame <= 0.0 {
            return Err(ConfigError::InvalidScrollHeight(self.scroll_height_per_frame));
        }
        if let CachePolicy::Bounded { capacity } = self.cache_policy {
            let window = self.window_len();
            if capacity < window {
                return Err(ConfigError::CapacityBelowWindow { capacity, window });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sizing() {
        let config = AnimConfig::default();
        assert_eq!(config.total_frames(), 1152);
        assert_eq!(config.total_frames(), TOTAL_FRAMES);
        assert_eq!(config.initial_frames(), 60);
        assert_eq!(config.window_len(), 41);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let mut config = AnimConfig { frames_per_sequence: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::EmptySequence));

        config.frames_per_sequence = 4;
        config.scroll_height_per_frame = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidScrollHeight(_))));

        config.scroll_height_per_frame = 5.0;
        config.cache_policy = CachePolicy::Bounded { capacity: 2 };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityBelowWindow { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_initial_frames_clamped_to_total() {
        let config = AnimConfig {
            sequence_count: 1,
            frames_per_sequence: 8,
            initial_preload_count: 60,
            ..Default::default()
        };
        assert_eq!(config.initial_frames(), 8);
    }

    #[test]
    fn test_cache_policy_json() {
        let policy: CachePolicy = serde_json::from_str(r#"{"bounded": {"capacity": 64}}"#).unwrap();
        assert_eq!(policy, CachePolicy::Bounded { capacity: 64 });
        let policy: CachePolicy = serde_json::from_str(r#""unbounded""#).unwrap();
        assert_eq!(policy, CachePolicy::Unbounded);

        let bounded = AnimConfig {
            cache_policy: CachePolicy::Bounded { capacity: 128 },
            ..Default::default()
        };
        let json = serde_json::to_string(&bounded).unwrap();
        assert!(json.contains("\"bounded\""));
    }
}
