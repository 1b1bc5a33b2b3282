//! Terminal client for the hiroba chat relay.

pub mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
pub use session::{SessionOutcome, run_client_session};
