//! Audio and haptic feedback.
//!
//! The [`FeedbackCoordinator`] is the only owner of live effect handles.
//! Backends do the actual playback and may finish a start asynchronously
//! ([`Playback::Pending`]); the coordinator reconciles late resolutions so a
//! stop issued in the meantime always wins.

mod backend;
mod coordinator;

pub use backend::{BackendCall, RecordingBackend, SilentBackend};
pub use coordinator::FeedbackCoordinator;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FeedbackError;

/// Vibrate/pause alternation played on completion, first value is the delay.
pub const DEFAULT_HAPTIC_PATTERN: [u64; 9] = [0, 500, 500, 500, 500, 500, 500, 500, 500];

/// Named feedback effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// One-shot tone played when the countdown begins.
    CountdownCue,
    /// Looping tick sound while the session is running.
    AmbientTick,
    /// Looping tone plus haptic burst once the session finishes.
    ///
    /// Terminal feedback: it outlives the transition that started it and is
    /// only stopped by acknowledgement, cancellation or a new session.
    Completion,
}

impl Effect {
    pub const ALL: [Effect; 3] = [Effect::CountdownCue, Effect::AmbientTick, Effect::Completion];

    pub fn as_str(self) -> &'static str {
        match self {
            Effect::CountdownCue => "countdown_cue",
            Effect::AmbientTick => "ambient_tick",
            Effect::Completion => "completion",
        }
    }

    pub fn is_looping(self) -> bool {
        !matches!(self, Effect::CountdownCue)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an effect the backend is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackHandle(u64);

impl FeedbackHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Identifies one call to [`FeedbackBackend::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Everything a backend needs to start an effect.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub request: RequestId,
    pub effect: Effect,
    pub looping: bool,
    /// 0.0 ..= 1.0
    pub volume: f32,
}

/// Outcome of [`FeedbackBackend::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Playing now.
    Started(FeedbackHandle),
    /// Still loading. The result is delivered later through
    /// `SessionController::resolve_feedback`.
    Pending,
}

/// Audio/haptic device abstraction.
pub trait FeedbackBackend {
    fn play(&mut self, request: &PlayRequest) -> Result<Playback, FeedbackError>;

    fn stop(&mut self, handle: FeedbackHandle) -> Result<(), FeedbackError>;

    /// Alternating delay/pulse durations in milliseconds.
    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), FeedbackError>;
}

impl<B: FeedbackBackend + ?Sized> FeedbackBackend for Box<B> {
    fn play(&mut self, request: &PlayRequest) -> Result<Playback, FeedbackError> {
        (**self).play(request)
    }

    fn stop(&mut self, handle: FeedbackHandle) -> Result<(), FeedbackError> {
        (**self).stop(handle)
    }

    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), FeedbackError> {
        (**self).vibrate(pattern)
    }
}

/// Playback preferences applied by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSettings {
    /// Skip all playback and haptics. State transitions are unaffected.
    pub muted: bool,
    pub cue_volume: f32,
    pub ambient_volume: f32,
    pub completion_volume: f32,
    pub vibration: bool,
    pub haptic_pattern: Vec<u64>,
}

impl FeedbackSettings {
    pub fn volume_for(&self, effect: Effect) -> f32 {
        let volume = match effect {
            Effect::CountdownCue => self.cue_volume,
            Effect::AmbientTick => self.ambient_volume,
            Effect::Completion => self.completion_volume,
        };
        volume.clamp(0.0, 1.0)
    }
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            muted: false,
            cue_volume: 1.0,
            ambient_volume: 0.5,
            completion_volume: 1.0,
            vibration: true,
            haptic_pattern: DEFAULT_HAPTIC_PATTERN.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_countdown_cue_is_one_shot() {
        assert!(!Effect::CountdownCue.is_looping());
        assert!(Effect::AmbientTick.is_looping());
        assert!(Effect::Completion.is_looping());
    }

    #[test]
    fn effect_serializes_snake_case() {
        let json = serde_json::to_string(&Effect::AmbientTick).unwrap();
        assert_eq!(json, "\"ambient_tick\"");
    }

    #[test]
    fn volumes_are_clamped() {
        let settings = FeedbackSettings {
            ambient_volume: 3.0,
            ..FeedbackSettings::default()
        };
        assert_eq!(settings.volume_for(Effect::AmbientTick), 1.0);
        assert_eq!(FeedbackSettings::default().volume_for(Effect::AmbientTick), 0.5);
    }
}
