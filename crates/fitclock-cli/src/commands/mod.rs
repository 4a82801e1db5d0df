pub mod config;
pub mod run;
pub mod simulate;

use std::path::PathBuf;

use clap::Args;
use fitclock_core::{
    Clock, Command, Event, FeedbackBackend, SessionController, SessionError, Workout,
};

/// Where the session duration comes from.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Duration in minutes
    #[arg(long, conflicts_with_all = ["seconds", "workout"])]
    pub minutes: Option<i64>,
    /// Duration in seconds
    #[arg(long, conflicts_with = "workout")]
    pub seconds: Option<i64>,
    /// JSON file holding a workout record, a list, or a `{"workouts": [...]}` response
    #[arg(long)]
    pub workout: Option<PathBuf>,
    /// Workout id to pick when the file holds several
    #[arg(long, requires = "workout")]
    pub id: Option<i64>,
    /// Label used in the completion notice
    #[arg(long)]
    pub title: Option<String>,
}

impl SessionArgs {
    /// Resolve the arguments into a start request. Duration validation is left
    /// to the controller.
    pub fn start_request(&self) -> Result<StartRequest, Box<dyn std::error::Error>> {
        if let Some(path) = &self.workout {
            let json = std::fs::read_to_string(path)?;
            let workouts = Workout::parse_document(&json)?;
            let mut workout = match self.id {
                Some(id) => workouts
                    .into_iter()
                    .find(|w| w.id == id)
                    .ok_or_else(|| format!("no workout with id {id} in {}", path.display()))?,
                None => workouts
                    .into_iter()
                    .next()
                    .ok_or_else(|| format!("no workouts in {}", path.display()))?,
            };
            if let Some(title) = &self.title {
                workout.title = title.clone();
            }
            return Ok(StartRequest::Workout(workout));
        }

        let duration_secs = match (self.minutes, self.seconds) {
            (Some(minutes), _) => minutes.saturating_mul(60),
            (None, Some(seconds)) => seconds,
            (None, None) => {
                return Err("one of --minutes, --seconds or --workout is required".into())
            }
        };
        Ok(StartRequest::Duration {
            duration_secs,
            label: self.title.clone(),
        })
    }
}

pub enum StartRequest {
    Duration {
        duration_secs: i64,
        label: Option<String>,
    },
    Workout(Workout),
}

impl StartRequest {
    pub fn into_command(self) -> Command {
        match self {
            StartRequest::Duration {
                duration_secs,
                label,
            } => Command::Start {
                duration_secs,
                label,
            },
            StartRequest::Workout(workout) => Command::StartWorkout(workout),
        }
    }

    pub fn apply<C: Clock, B: FeedbackBackend>(
        self,
        controller: &mut SessionController<C, B>,
    ) -> Result<Event, SessionError> {
        match self {
            StartRequest::Duration {
                duration_secs,
                label,
            } => controller.start_labeled(duration_secs, label),
            StartRequest::Workout(workout) => controller.start_workout(&workout),
        }
    }
}
