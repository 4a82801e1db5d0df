//! Runs one session controller on a single tokio task.
//!
//! Commands and tick deadlines are multiplexed with `select!`, so every
//! transition executes on the same task and ticks never overlap. Closing
//! the command channel tears the session down.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{FeedbackError, SessionError};
use crate::events::Event;
use crate::feedback::{FeedbackBackend, FeedbackHandle, RequestId};
use crate::scheduler::MonotonicClock;
use crate::session::SessionController;
use crate::workout::Workout;

/// Requests accepted by [`SessionDriver`].
#[derive(Debug)]
pub enum Command {
    Start {
        duration_secs: i64,
        label: Option<String>,
    },
    StartWorkout(Workout),
    Pause,
    Resume,
    Reset,
    Cancel,
    Acknowledge,
    /// Emit a `state_snapshot` event.
    Snapshot,
    /// A backend finished a deferred start.
    FeedbackResolved {
        request: RequestId,
        result: Result<FeedbackHandle, FeedbackError>,
    },
}

/// What the driver reports back: an event, or a rejected start.
pub type Update = Result<Event, SessionError>;

pub struct SessionDriver<B: FeedbackBackend> {
    controller: SessionController<MonotonicClock, B>,
    commands: mpsc::Receiver<Command>,
    updates: mpsc::UnboundedSender<Update>,
}

impl<B: FeedbackBackend> SessionDriver<B> {
    /// Build a driver plus the command sender and update receiver.
    pub fn new(
        controller: SessionController<MonotonicClock, B>,
        capacity: usize,
    ) -> (Self, mpsc::Sender<Command>, mpsc::UnboundedReceiver<Update>) {
        let (command_tx, command_rx) = mpsc::channel(capacity.max(1));
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let driver = Self {
            controller,
            commands: command_rx,
            updates: update_tx,
        };
        (driver, command_tx, update_rx)
    }

    /// Run until the command channel closes, then cancel the session and
    /// hand the controller back.
    pub async fn run(mut self) -> SessionController<MonotonicClock, B> {
        info!("session driver started");
        loop {
            let clock = *self.controller.scheduler().clock();
            let deadline = self
                .controller
                .next_deadline_ms()
                .map(|ms| clock.instant_at(ms));

            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = wait_until(deadline) => {
                    for event in self.controller.pump() {
                        self.emit(Ok(event));
                    }
                }
            }
        }

        if let Some(event) = self.controller.cancel() {
            self.emit(Ok(event));
        }
        info!("session driver stopped");
        self.controller
    }

    fn handle(&mut self, command: Command) {
        debug!(?command, "driver command");
        let update = match command {
            Command::Start {
                duration_secs,
                label,
            } => Some(self.controller.start_labeled(duration_secs, label)),
            Command::StartWorkout(workout) => Some(self.controller.start_workout(&workout)),
            Command::Pause => self.controller.pause().map(Ok),
            Command::Resume => self.controller.resume().map(Ok),
            Command::Reset => self.controller.reset().map(Ok),
            Command::Cancel => self.controller.cancel().map(Ok),
            Command::Acknowledge => self.controller.acknowledge().map(Ok),
            Command::Snapshot => Some(Ok(self.controller.snapshot())),
            Command::FeedbackResolved { request, result } => {
                self.controller.resolve_feedback(request, result);
                None
            }
        };
        if let Some(update) = update {
            self.emit(update);
        }
    }

    fn emit(&self, update: Update) {
        if self.updates.send(update).is_err() {
            debug!("update receiver dropped");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
