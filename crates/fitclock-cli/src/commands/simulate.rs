//! Deterministic session replay on a manual clock.

use std::collections::BTreeMap;

use clap::Args;
use fitclock_core::feedback::RecordingBackend;
use fitclock_core::{Clock, Config, Effect, Event, ManualClock, SessionController, SessionState};
use serde::Serialize;
use tracing::info;

use super::SessionArgs;

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    /// Pause after this many seconds of workout time have elapsed
    #[arg(long)]
    pub pause_at: Option<u64>,
    /// Seconds of wall time to stay paused before resuming
    #[arg(long, default_value_t = 5, requires = "pause_at")]
    pub pause_for: u64,
    /// Leave the completion tone playing instead of acknowledging
    #[arg(long)]
    pub no_ack: bool,
}

#[derive(Serialize)]
struct Summary {
    #[serde(rename = "type")]
    kind: &'static str,
    elapsed_ms: u64,
    plays: BTreeMap<&'static str, usize>,
    stops: usize,
    vibrations: usize,
    still_playing: Vec<Effect>,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let clock = ManualClock::new();
    let mut controller =
        SessionController::from_config(clock.clone(), RecordingBackend::new(), &config);

    let first = args.session.start_request()?.apply(&mut controller)?;
    print_event(&first)?;
    info!(total_secs = controller.total_seconds(), "simulation started");

    let mut paused = false;
    loop {
        let Some(deadline) = controller.next_deadline_ms() else {
            break;
        };
        clock.set(deadline);
        let mut done = false;
        for event in controller.pump() {
            print_event(&event)?;
            done |= matches!(event, Event::Completed { .. });
        }
        if done {
            break;
        }

        let elapsed = controller.total_seconds() - controller.remaining_seconds();
        if !paused
            && args.pause_at == Some(elapsed)
            && controller.current_state() == SessionState::Running
        {
            paused = true;
            if let Some(event) = controller.pause() {
                print_event(&event)?;
                clock.advance(args.pause_for.saturating_mul(1000));
                if let Some(event) = controller.resume() {
                    print_event(&event)?;
                }
            }
        }
    }

    if !args.no_ack {
        if let Some(event) = controller.acknowledge() {
            print_event(&event)?;
        }
    }

    let backend = controller.feedback().backend();
    let summary = Summary {
        kind: "summary",
        elapsed_ms: clock.now_ms(),
        plays: Effect::ALL
            .iter()
            .map(|&effect| (effect.as_str(), backend.play_count(effect)))
            .collect(),
        stops: backend.stop_count(),
        vibrations: backend.vibrations().len(),
        still_playing: backend.playing_effects(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
