use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Effect, FeedbackBackend, FeedbackHandle, FeedbackSettings, PlayRequest, Playback, RequestId};
use crate::error::FeedbackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Silent,
    /// `play` returned `Pending`; waiting for `resolve`.
    Starting(RequestId),
    Playing { handle: FeedbackHandle },
}

/// Idempotent start/stop of named effects over a [`FeedbackBackend`].
///
/// At most one live handle per effect. Backend failures are logged and
/// swallowed; callers only ever observe "playing" or "silent".
#[derive(Debug)]
pub struct FeedbackCoordinator<B> {
    backend: B,
    settings: FeedbackSettings,
    slots: HashMap<Effect, Slot>,
    /// Requests still awaiting resolution, including ones already superseded.
    pending: HashMap<RequestId, Effect>,
    starts: HashMap<Effect, u32>,
    last_request: u64,
}

impl<B: FeedbackBackend> FeedbackCoordinator<B> {
    pub fn new(backend: B, settings: FeedbackSettings) -> Self {
        Self {
            backend,
            settings,
            slots: HashMap::new(),
            pending: HashMap::new(),
            starts: HashMap::new(),
            last_request: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn settings(&self) -> &FeedbackSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: FeedbackSettings) {
        self.settings = settings;
    }

    /// Start `effect`, stopping any instance already playing.
    pub fn start(&mut self, effect: Effect) {
        self.stop(effect);
        *self.starts.entry(effect).or_default() += 1;

        if self.settings.muted {
            debug!(%effect, "feedback muted");
            return;
        }

        self.last_request += 1;
        let request = PlayRequest {
            request: RequestId(self.last_request),
            effect,
            looping: effect.is_looping(),
            volume: self.settings.volume_for(effect),
        };

        match self.backend.play(&request) {
            Ok(Playback::Started(handle)) => {
                self.slots.insert(effect, Slot::Playing { handle });
            }
            Ok(Playback::Pending) => {
                self.slots.insert(effect, Slot::Starting(request.request));
                self.pending.insert(request.request, effect);
            }
            Err(e) => warn!(%effect, error = %e, "feedback start failed; continuing silently"),
        }

        if effect == Effect::Completion && self.settings.vibration {
            if let Err(e) = self.backend.vibrate(&self.settings.haptic_pattern) {
                warn!(error = %e, "haptic pattern failed");
            }
        }
    }

    /// Stop `effect`. No-op when silent.
    ///
    /// The handle is released even if the backend reports a failure. A start
    /// still in flight is left to [`resolve`](Self::resolve), which stops it
    /// on arrival.
    pub fn stop(&mut self, effect: Effect) {
        match self.slots.insert(effect, Slot::Silent) {
            Some(Slot::Playing { handle }) => {
                if let Err(e) = self.backend.stop(handle) {
                    warn!(%effect, error = %e, "feedback stop failed; handle released");
                }
            }
            Some(Slot::Starting(request)) => {
                debug!(%effect, request = request.id(), "stop requested while start in flight");
            }
            Some(Slot::Silent) | None => {}
        }
    }

    pub fn stop_all(&mut self) {
        for effect in Effect::ALL {
            self.stop(effect);
        }
    }

    /// Deliver the outcome of a [`Playback::Pending`] start.
    ///
    /// A start that was stopped or superseded before it resolved is stopped
    /// immediately.
    pub fn resolve(&mut self, request: RequestId, result: Result<FeedbackHandle, FeedbackError>) {
        let Some(effect) = self.pending.remove(&request) else {
            warn!(error = %FeedbackError::UnknownRequest(request.id()), "ignoring feedback resolution");
            if let Ok(handle) = result {
                self.release(handle);
            }
            return;
        };

        let wanted = self.slots.get(&effect) == Some(&Slot::Starting(request));
        match result {
            Ok(handle) if wanted => {
                self.slots.insert(effect, Slot::Playing { handle });
            }
            Ok(handle) => {
                debug!(%effect, request = request.id(), "start resolved after stop; stopping");
                self.release(handle);
            }
            Err(e) => {
                warn!(%effect, error = %e, "feedback start failed; continuing silently");
                if wanted {
                    self.slots.insert(effect, Slot::Silent);
                }
            }
        }
    }

    /// Playing or starting.
    pub fn is_active(&self, effect: Effect) -> bool {
        !matches!(self.slots.get(&effect), Some(Slot::Silent) | None)
    }

    pub fn active_effects(&self) -> Vec<Effect> {
        Effect::ALL
            .into_iter()
            .filter(|e| self.is_active(*e))
            .collect()
    }

    /// Starts still awaiting resolution, including superseded ones.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// How many times `start(effect)` has been called.
    pub fn start_count(&self, effect: Effect) -> u32 {
        self.starts.get(&effect).copied().unwrap_or(0)
    }

    fn release(&mut self, handle: FeedbackHandle) {
        if let Err(e) = self.backend.stop(handle) {
            warn!(error = %e, "failed to stop late feedback start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{BackendCall, RecordingBackend};

    fn coordinator() -> FeedbackCoordinator<RecordingBackend> {
        FeedbackCoordinator::new(RecordingBackend::new(), FeedbackSettings::default())
    }

    #[test]
    fn stop_when_silent_is_noop() {
        let mut fb = coordinator();
        fb.stop(Effect::AmbientTick);
        fb.stop_all();
        assert!(fb.backend().calls().is_empty());
    }

    #[test]
    fn restart_stops_previous_instance() {
        let mut fb = coordinator();
        fb.start(Effect::AmbientTick);
        fb.start(Effect::AmbientTick);
        assert_eq!(fb.backend().play_count(Effect::AmbientTick), 2);
        assert_eq!(fb.backend().stop_count(), 1);
        assert_eq!(fb.backend().playing_effects(), vec![Effect::AmbientTick]);
        assert_eq!(fb.start_count(Effect::AmbientTick), 2);
    }

    #[test]
    fn ambient_plays_looping_at_half_volume() {
        let mut fb = coordinator();
        fb.start(Effect::AmbientTick);
        match &fb.backend().calls()[0] {
            BackendCall::Play { effect, looping, volume_pct, .. } => {
                assert_eq!(*effect, Effect::AmbientTick);
                assert!(*looping);
                assert_eq!(*volume_pct, 50);
            }
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn completion_vibrates_with_pattern() {
        let mut fb = coordinator();
        fb.start(Effect::Completion);
        assert_eq!(
            fb.backend().vibrations(),
            vec![crate::feedback::DEFAULT_HAPTIC_PATTERN.to_vec()]
        );
    }

    #[test]
    fn vibration_can_be_disabled() {
        let settings = FeedbackSettings {
            vibration: false,
            ..FeedbackSettings::default()
        };
        let mut fb = FeedbackCoordinator::new(RecordingBackend::new(), settings);
        fb.start(Effect::Completion);
        assert!(fb.backend().vibrations().is_empty());
        assert!(fb.is_active(Effect::Completion));
    }

    #[test]
    fn muted_counts_starts_without_playing() {
        let settings = FeedbackSettings {
            muted: true,
            ..FeedbackSettings::default()
        };
        let mut fb = FeedbackCoordinator::new(RecordingBackend::new(), settings);
        fb.start(Effect::Completion);
        assert_eq!(fb.start_count(Effect::Completion), 1);
        assert!(fb.backend().calls().is_empty());
        assert!(fb.active_effects().is_empty());
    }

    #[test]
    fn stop_during_pending_start_wins() {
        let mut fb = FeedbackCoordinator::new(RecordingBackend::deferred(), FeedbackSettings::default());
        fb.start(Effect::AmbientTick);
        assert!(fb.is_active(Effect::AmbientTick));

        fb.stop(Effect::AmbientTick);
        assert!(!fb.is_active(Effect::AmbientTick));

        let req = fb.backend_mut().take_pending().remove(0);
        let handle = fb.backend_mut().open(&req);
        fb.resolve(req.request, Ok(handle));

        assert!(!fb.is_active(Effect::AmbientTick));
        assert!(fb.backend().playing_effects().is_empty());
        assert_eq!(fb.pending_count(), 0);
    }

    #[test]
    fn superseded_pending_start_is_stopped_on_arrival() {
        let mut fb = FeedbackCoordinator::new(RecordingBackend::deferred(), FeedbackSettings::default());
        fb.start(Effect::AmbientTick);
        fb.start(Effect::AmbientTick);
        let mut reqs = fb.backend_mut().take_pending();
        let second = reqs.pop().unwrap();
        let first = reqs.pop().unwrap();

        let h2 = fb.backend_mut().open(&second);
        fb.resolve(second.request, Ok(h2));
        let h1 = fb.backend_mut().open(&first);
        fb.resolve(first.request, Ok(h1));

        assert_eq!(fb.backend().playing_effects(), vec![Effect::AmbientTick]);
        assert!(fb.is_active(Effect::AmbientTick));
        fb.stop(Effect::AmbientTick);
        assert!(fb.backend().playing_effects().is_empty());
    }

    #[test]
    fn failed_start_leaves_effect_silent() {
        let mut backend = RecordingBackend::new();
        backend.fail_effect(Effect::AmbientTick);
        let mut fb = FeedbackCoordinator::new(backend, FeedbackSettings::default());
        fb.start(Effect::AmbientTick);
        assert!(!fb.is_active(Effect::AmbientTick));
        assert_eq!(fb.start_count(Effect::AmbientTick), 1);
    }

    #[test]
    fn failed_stop_still_releases_handle() {
        let mut backend = RecordingBackend::new();
        backend.fail_stops();
        let mut fb = FeedbackCoordinator::new(backend, FeedbackSettings::default());
        fb.start(Effect::Completion);
        fb.stop(Effect::Completion);
        assert!(!fb.is_active(Effect::Completion));
    }

    #[test]
    fn unknown_resolution_is_released() {
        let mut fb = coordinator();
        let handle = FeedbackHandle::new(42);
        fb.resolve(RequestId(999), Ok(handle));
        assert!(fb
            .backend()
            .calls()
            .contains(&BackendCall::Stop { handle }));
    }
}
