mod controller;
mod state;

pub use controller::{SessionController, COUNTDOWN_START, DEFAULT_TICK_INTERVAL_MS};
pub use state::{Session, SessionState};
