//! Async driver for a [`SessionController`](crate::session::SessionController).

mod driver;

pub use driver::{Command, SessionDriver, Update};
