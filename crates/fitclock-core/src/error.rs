//! Core error types for fitclock-core.
//!
//! Session errors are the only ones a caller of the controller ever sees.
//! Feedback and scheduler errors are produced internally, logged, and
//! swallowed at the coordinator boundary so they never stall the state
//! machine.

use std::path::PathBuf;
use thiserror::Error;

use crate::feedback::Effect;
use crate::scheduler::TimerHandle;

/// Core error type for fitclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Feedback backend errors
    #[error("Feedback error: {0}")]
    Feedback(#[from] FeedbackError),

    /// Tick scheduler misuse
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors returned when a session cannot be started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Duration was zero or negative
    #[error("Invalid duration: {seconds}s (must be a positive number of seconds)")]
    InvalidDuration { seconds: i64 },

    /// Workout record carries no duration
    #[error("Workout {workout_id} has no duration")]
    MissingDuration { workout_id: i64 },
}

/// Feedback backend errors. Never surfaced through the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// The backend could not start or stop an effect
    #[error("Feedback unavailable for {effect}: {message}")]
    Unavailable { effect: Effect, message: String },

    /// A resolution arrived for a request the coordinator never issued
    #[error("Unknown feedback request: {0}")]
    UnknownRequest(u64),
}

/// Tick scheduler misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A timer was armed while another one was still armed
    #[error("Timer armed while {existing} was still armed")]
    AlreadyArmed { existing: TimerHandle },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_duration_message_names_the_value() {
        let err = SessionError::InvalidDuration { seconds: -5 };
        assert!(err.to_string().contains("-5s"));
    }

    #[test]
    fn session_error_converts_into_core_error() {
        let err: CoreError = SessionError::MissingDuration { workout_id: 7 }.into();
        assert!(matches!(err, CoreError::Session(_)));
        assert!(err.to_string().contains("Workout 7"));
    }

    #[test]
    fn feedback_error_names_the_effect() {
        let err = FeedbackError::Unavailable {
            effect: Effect::AmbientTick,
            message: "device busy".into(),
        };
        assert_eq!(
            err.to_string(),
            "Feedback unavailable for ambient_tick: device busy"
        );
    }
}
