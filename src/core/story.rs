//! Story script and the overlay ("balloon") state machine
//!
//! A trigger fires at `sequence_index * frames_per_sequence + frame_index`.
//! For a target frame the most recent trigger at or before it is selected by
//! scanning the script from last to first; its scene is shown while fewer than
//! `balloon_visibility_window` frames have passed since the trigger.
//!
//! Scrolling backwards follows the same scan: the scene that reappears is the
//! one of the latest trigger not after the target, if its window still covers it.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::AnimConfig;

/// What the balloon shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    /// Scene type, e.g. "Deep Cave"
    pub kind: String,
    /// Ordered colors, CSS hex
    pub palette: Vec<String>,
    pub creature: String,
    pub description: String,
}

impl SceneDescriptor {
    pub fn new(kind: &str, palette: &[&str], creature: &str, description: &str) -> Self {
        Self {
            kind: kind.to_string(),
            palette: palette.iter().map(|c| c.to_string()).collect(),
            creature: creature.to_string(),
            description: description.to_string(),
        }
    }
}

/// Scripted (sequence, frame) position where a scene becomes eligible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPoint {
    pub sequence_index: usize,
    pub frame_index: usize,
    pub scene: SceneDescriptor,
}

impl TriggerPoint {
    pub fn absolute_frame(&self, frames_per_sequence: usize) -> usize {
        self.sequence_index * frames_per_sequence + self.frame_index
    }
}

/// Script validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    FrameOutsideSequence { trigger: usize, frame_index: usize },
    OutOfRange { trigger: usize, absolute: usize },
    Unsorted { trigger: usize, absolute: usize, previous: usize },
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::FrameOutsideSequence { trigger, frame_index } => write!(
                f,
                "trigger #{}: frame_index {} is outside its sequence",
                trigger, frame_index
            ),
            ScriptError::OutOfRange { trigger, absolute } => {
                write!(f, "trigger #{}: absolute frame {} is past the last frame", trigger, absolute)
            }
            ScriptError::Unsorted { trigger, absolute, previous } => write!(
                f,
                "trigger #{}: absolute frame {} comes after {} (script must be ascending)",
                trigger, absolute, previous
            ),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Validated, ascending list of triggers
#[derive(Debug, Clone, PartialEq)]
pub struct StoryScript {
    /// (absolute frame, trigger), ascending
    triggers: Vec<(usize, TriggerPoint)>,
    visibility_window: usize,
}

impl StoryScript {
    /// Validate `triggers` against `config`.
    ///
    /// Triggers must be ascending by absolute frame; equal frames are allowed
    /// (the later entry wins the scan).
    pub fn new(triggers: Vec<TriggerPoint>, config: &AnimConfig) -> Result<Self, ScriptError> {
        let total = config.total_frames();
        let mut resolved = Vec::with_capacity(triggers.len());
        let mut previous: Option<usize> = None;

        for (i, trigger) in triggers.into_iter().enumerate() {
            if trigger.frame_index >= config.frames_per_sequence {
                return Err(ScriptError::FrameOutsideSequence {
                    trigger: i,
                    frame_index: trigger.frame_index,
                });
            }
            let absolute = trigger.absolute_frame(config.frames_per_sequence);
            if absolute >= total {
                return Err(ScriptError::OutOfRange { trigger: i, absolute });
            }
            if let Some(prev) = previous {
                if absolute < prev {
                    return Err(ScriptError::Unsorted { trigger: i, absolute, previous: prev });
                }
            }
            previous = Some(absolute);
            resolved.push((absolute, trigger));
        }

        debug!("Story script: {} triggers", resolved.len());
        Ok(Self {
            triggers: resolved,
            visibility_window: config.balloon_visibility_window,
        })
    }

    /// Script without triggers: the overlay never shows
    pub fn empty(config: &AnimConfig) -> Self {
        Self {
            triggers: Vec::new(),
            visibility_window: config.balloon_visibility_window,
        }
    }

    /// The seven scenes of the reference animation
    pub fn reference(config: &AnimConfig) -> Result<Self, ScriptError> {
        Self::new(reference_triggers(), config)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Absolute trigger frames, ascending
    pub fn trigger_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.triggers.iter().map(|(frame, _)| *frame)
    }

    /// Latest trigger at or before `target`, with its absolute frame
    pub fn latest_trigger(&self, target: usize) -> Option<(usize, &TriggerPoint)> {
        self.triggers
            .iter()
            .rev()
            .find(|(frame, _)| *frame <= target)
            .map(|(frame, trigger)| (*frame, trigger))
    }

    /// Scene that should be visible at `target`
    pub fn scene_at(&self, target: usize) -> Option<&SceneDescriptor> {
        let (frame, trigger) = self.latest_trigger(target)?;
        let elapsed = target - frame;
        (elapsed < self.visibility_window).then_some(&trigger.scene)
    }
}

/// Balloon state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "scene", rename_all = "snake_case")]
pub enum Overlay {
    #[default]
    Inactive,
    Active(SceneDescriptor),
}

impl Overlay {
    pub fn scene(&self) -> Option<&SceneDescriptor> {
        match self {
            Overlay::Inactive => None,
            Overlay::Active(scene) => Some(scene),
        }
    }
}

/// Holds what is currently displayed, only to suppress redundant transitions
#[derive(Debug, Clone, Default)]
pub struct OverlayMachine {
    current: Overlay,
}

impl OverlayMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Overlay {
        &self.current
    }

    /// Re-evaluate against `target`. Returns the new state if it changed.
    pub fn evaluate(&mut self, script: &StoryScript, target: usize) -> Option<&Overlay> {
        match script.scene_at(target) {
            Some(scene) => {
                let same_creature = self
                    .current
                    .scene()
                    .is_some_and(|current| current.creature == scene.creature);
                if same_creature {
                    return None;
                }
                info!("Balloon: {} / {} (frame {})", scene.kind, scene.creature, target);
                self.current = Overlay::Active(scene.clone());
            }
            None => {
                if self.current == Overlay::Inactive {
                    return None;
                }
                info!("Balloon hidden (frame {})", target);
                self.current = Overlay::Inactive;
            }
        }
        Some(&self.current)
    }
}

fn reference_triggers() -> Vec<TriggerPoint> {
    let t = |sequence_index, frame_index, scene| TriggerPoint {
        sequence_index,
        frame_index,
        scene,
    };
    vec![
        t(0, 0, SceneDescriptor::new(
            "Sunny Meadow",
            &["#8BC34A", "#FFEB3B", "#81D4FA"],
            "Sheep",
            "A flock grazes where the journey begins.",
        )),
        t(1, 0, SceneDescriptor::new(
            "Birch Forest",
            &["#E0E0E0", "#66BB6A", "#795548"],
            "Fox",
            "Something quick and orange darts between the trunks.",
        )),
        t(2, 0, SceneDescriptor::new(
            "Desert Dunes",
            &["#FFE0B2", "#FFB74D", "#BF360C"],
            "Camel",
            "Slow steps across the sand, carrying everything it needs.",
        )),
        t(3, 0, SceneDescriptor::new(
            "Mangrove Swamp",
            &["#33691E", "#558B2F", "#4E342E"],
            "Frog",
            "The water ripples with every leap.",
        )),
        t(4, 0, SceneDescriptor::new(
            "Snowy Peaks",
            &["#FAFAFA", "#B3E5FC", "#607D8B"],
            "Goat",
            "High on the cliffs, a goat keeps perfect balance.",
        )),
        t(5, 0, SceneDescriptor::new(
            "Deep Cave",
            &["#212121", "#4A148C", "#D32F2F"],
            "Cave Spider",
            "Red eyes glint in the dark below.",
        )),
        t(5, 191, SceneDescriptor::new(
            "Ancient City",
            &["#0D1B2A", "#1B263B", "#00E5FF"],
            "Warden",
            "At the very bottom, something listens.",
        )),
    ]
}
