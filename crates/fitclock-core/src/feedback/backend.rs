use std::collections::HashSet;

use super::{Effect, FeedbackBackend, FeedbackHandle, PlayRequest, Playback};
use crate::error::FeedbackError;

/// Backend that plays nothing and never fails.
#[derive(Debug, Default)]
pub struct SilentBackend {
    last_handle: u64,
}

impl FeedbackBackend for SilentBackend {
    fn play(&mut self, _request: &PlayRequest) -> Result<Playback, FeedbackError> {
        self.last_handle += 1;
        Ok(Playback::Started(FeedbackHandle::new(self.last_handle)))
    }

    fn stop(&mut self, _handle: FeedbackHandle) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn vibrate(&mut self, _pattern: &[u64]) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// A call observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Play {
        effect: Effect,
        request: u64,
        looping: bool,
        volume_pct: u8,
    },
    Stop {
        handle: FeedbackHandle,
    },
    Vibrate {
        pattern: Vec<u64>,
    },
}

/// In-memory backend that records every call and tracks what is still
/// playing, so leaks show up as entries in [`playing_effects`].
///
/// Can defer starts (returning [`Playback::Pending`]) and inject failures.
///
/// [`playing_effects`]: RecordingBackend::playing_effects
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    playing: Vec<(FeedbackHandle, Effect)>,
    pending: Vec<PlayRequest>,
    last_handle: u64,
    defer: bool,
    failing: HashSet<Effect>,
    fail_stops: bool,
    fail_vibrate: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `play` returns `Pending`; see [`take_pending`](Self::take_pending).
    pub fn deferred() -> Self {
        Self {
            defer: true,
            ..Self::default()
        }
    }

    pub fn fail_effect(&mut self, effect: Effect) {
        self.failing.insert(effect);
    }

    pub fn fail_stops(&mut self) {
        self.fail_stops = true;
    }

    pub fn fail_vibrate(&mut self) {
        self.fail_vibrate = true;
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Deferred starts not yet handed out.
    pub fn take_pending(&mut self) -> Vec<PlayRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Finish a deferred start: the effect is now audible.
    pub fn open(&mut self, request: &PlayRequest) -> FeedbackHandle {
        let handle = self.next_handle();
        self.playing.push((handle, request.effect));
        handle
    }

    /// Effects currently audible, in start order. Duplicates mean a leak.
    pub fn playing_effects(&self) -> Vec<Effect> {
        self.playing.iter().map(|(_, e)| *e).collect()
    }

    pub fn is_playing(&self, effect: Effect) -> bool {
        self.playing.iter().any(|(_, e)| *e == effect)
    }

    pub fn play_count(&self, effect: Effect) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Play { effect: e, .. } if *e == effect))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Stop { .. }))
            .count()
    }

    pub fn vibrations(&self) -> Vec<Vec<u64>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Vibrate { pattern } => Some(pattern.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_handle(&mut self) -> FeedbackHandle {
        self.last_handle += 1;
        FeedbackHandle::new(self.last_handle)
    }
}

impl FeedbackBackend for RecordingBackend {
    fn play(&mut self, request: &PlayRequest) -> Result<Playback, FeedbackError> {
        self.calls.push(BackendCall::Play {
            effect: request.effect,
            request: request.request.id(),
            looping: request.looping,
            volume_pct: (request.volume * 100.0).round() as u8,
        });
        if self.failing.contains(&request.effect) {
            return Err(FeedbackError::Unavailable {
                effect: request.effect,
                message: "injected failure".into(),
            });
        }
        if self.defer {
            self.pending.push(request.clone());
            return Ok(Playback::Pending);
        }
        Ok(Playback::Started(self.open(request)))
    }

    fn stop(&mut self, handle: FeedbackHandle) -> Result<(), FeedbackError> {
        self.calls.push(BackendCall::Stop { handle });
        let effect = self.playing.iter().find(|(h, _)| *h == handle).map(|(_, e)| *e);
        if self.fail_stops {
            return Err(FeedbackError::Unavailable {
                effect: effect.unwrap_or(Effect::AmbientTick),
                message: "injected stop failure".into(),
            });
        }
        self.playing.retain(|(h, _)| *h != handle);
        Ok(())
    }

    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), FeedbackError> {
        self.calls.push(BackendCall::Vibrate {
            pattern: pattern.to_vec(),
        });
        if self.fail_vibrate {
            return Err(FeedbackError::Unavailable {
                effect: Effect::Completion,
                message: "injected haptic failure".into(),
            });
        }
        Ok(())
    }
}
