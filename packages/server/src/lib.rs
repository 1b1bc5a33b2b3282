//! Session-scoped chat relay.
//!
//! Participants and viewers connect over WebSocket to a named session. Every message
//! is appended to the session log with a sequence number before it is fanned out, and
//! reconnecting participants get the part of the log they are entitled to replayed.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
