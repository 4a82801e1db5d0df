//! Feedback through the terminal bell.
//!
//! The countdown cue rings once. Completion rings every couple of seconds on
//! a background task until it is stopped. The ambient tick is tracked but
//! stays quiet, and haptics are only logged.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use fitclock_core::feedback::{FeedbackHandle, PlayRequest, Playback};
use fitclock_core::{Effect, FeedbackBackend, FeedbackError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMPLETION_RING_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct TerminalBackend {
    last_handle: u64,
    loops: HashMap<FeedbackHandle, Option<JoinHandle<()>>>,
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ring() {
    let mut stderr = std::io::stderr();
    // Best effort; a closed stderr just means no bell.
    let _ = stderr.write_all(b"\x07").and_then(|_| stderr.flush());
}

impl FeedbackBackend for TerminalBackend {
    fn play(&mut self, request: &PlayRequest) -> Result<Playback, FeedbackError> {
        self.last_handle += 1;
        let handle = FeedbackHandle::new(self.last_handle);
        let audible = request.volume > 0.0;
        debug!(effect = %request.effect, volume = request.volume, "terminal play");

        match request.effect {
            Effect::CountdownCue => {
                if audible {
                    ring();
                }
                return Ok(Playback::Started(handle));
            }
            Effect::AmbientTick => {
                self.loops.insert(handle, None);
            }
            Effect::Completion => {
                let task = match Handle::try_current() {
                    Ok(runtime) if audible => Some(runtime.spawn(async {
                        let mut interval = tokio::time::interval(COMPLETION_RING_INTERVAL);
                        loop {
                            interval.tick().await;
                            ring();
                        }
                    })),
                    Ok(_) => None,
                    Err(_) => {
                        if audible {
                            ring();
                        }
                        None
                    }
                };
                self.loops.insert(handle, task);
            }
        }
        Ok(Playback::Started(handle))
    }

    fn stop(&mut self, handle: FeedbackHandle) -> Result<(), FeedbackError> {
        if let Some(Some(task)) = self.loops.remove(&handle) {
            task.abort();
        }
        Ok(())
    }

    fn vibrate(&mut self, pattern: &[u64]) -> Result<(), FeedbackError> {
        info!(?pattern, "vibrate");
        Ok(())
    }
}

impl Drop for TerminalBackend {
    fn drop(&mut self) {
        for task in self.loops.drain().filter_map(|(_, task)| task) {
            task.abort();
        }
    }
}
