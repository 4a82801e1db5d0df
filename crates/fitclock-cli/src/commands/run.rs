//! Live session driven by the wall clock.
//!
//! Events are written to stdout as JSON lines, the countdown display goes to
//! stderr. Single-letter commands are read from stdin:
//! `p` pause, `r` resume, `x` reset, `a` acknowledge, `s` snapshot, `q` quit.

use clap::Args;
use fitclock_core::display::{completion_notice, format_clock};
use fitclock_core::{Command, Config, Event, MonotonicClock, SessionController, SessionDriver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::SessionArgs;
use crate::terminal::TerminalBackend;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    /// Disable audio and haptic feedback for this run
    #[arg(long)]
    pub mute: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    if args.mute {
        config.feedback.enabled = false;
    }
    let start = args.session.start_request()?.into_command();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_session(config, start));
    // Stdin is read on a blocking thread that may never return.
    runtime.shutdown_background();
    result
}

async fn run_session(config: Config, start: Command) -> Result<(), Box<dyn std::error::Error>> {
    let controller =
        SessionController::from_config(MonotonicClock::new(), TerminalBackend::new(), &config);
    let (driver, commands, mut updates) = SessionDriver::new(controller, 16);
    let driver = tokio::spawn(driver.run());

    commands.send(start).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut completed = false;

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                let event = update?;
                println!("{}", serde_json::to_string(&event)?);
                render(&event);
                match event {
                    Event::Completed { .. } => {
                        completed = true;
                        if !stdin_open {
                            commands.send(Command::Acknowledge).await?;
                        }
                    }
                    Event::Acknowledged { .. } | Event::Cancelled { .. } => break,
                    _ => {}
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        if let Some(command) = parse_key(line.trim()) {
                            commands.send(command).await?;
                        }
                    }
                    None => {
                        info!("stdin closed, completion will be acknowledged automatically");
                        stdin_open = false;
                        if completed {
                            commands.send(Command::Acknowledge).await?;
                        }
                    }
                }
            }
        }
    }

    drop(commands);
    let controller = driver.await?;
    info!(state = ?controller.current_state(), "session finished");
    eprintln!();
    Ok(())
}

fn parse_key(key: &str) -> Option<Command> {
    match key {
        "" => None,
        "p" => Some(Command::Pause),
        "r" => Some(Command::Resume),
        "x" => Some(Command::Reset),
        "a" => Some(Command::Acknowledge),
        "s" => Some(Command::Snapshot),
        "q" => Some(Command::Cancel),
        other => {
            warn!(key = other, "unknown key (p/r/x/a/s/q)");
            None
        }
    }
}

fn render(event: &Event) {
    match event {
        Event::CountdownStarted { countdown, .. } | Event::CountdownTick { countdown, .. } => {
            eprint!("\rstarting in {countdown}   ");
        }
        Event::WorkoutStarted { remaining_secs, .. }
        | Event::Tick { remaining_secs, .. }
        | Event::Resumed { remaining_secs, .. } => {
            eprint!("\r{}          ", format_clock(*remaining_secs));
        }
        Event::Paused { remaining_secs, .. } | Event::Reset { remaining_secs, .. } => {
            eprint!("\r{} paused   ", format_clock(*remaining_secs));
        }
        Event::Completed { label, .. } => {
            eprintln!("\r{}", completion_notice(label.as_deref()));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_commands() {
        assert!(matches!(parse_key("p"), Some(Command::Pause)));
        assert!(matches!(parse_key("q"), Some(Command::Cancel)));
        assert!(parse_key("").is_none());
        assert!(parse_key("z").is_none());
    }
}
