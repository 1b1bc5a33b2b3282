//! Error taxonomy of the relay.
//!
//! Every error is scoped to one session or one connection; none of them is fatal
//! to the relay process.

use thiserror::Error;

use super::value_object::ValueObjectError;

/// Reserved close reason signaling that the client identifier is taken
pub const IDENTITY_CONFLICT_REASON: &str = "Client ID already in use";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Operation on an unknown session
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// Append or connection attempted after the session ended
    #[error("session '{0}' has ended")]
    SessionEnded(String),

    /// Operation that requires an ended session
    #[error("session '{0}' is still active")]
    SessionActive(String),

    /// Duplicate client identifier among open participants of one session
    #[error("client id '{0}' is already in use")]
    IdentityConflict(String),

    /// Session or user password mismatch
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// Send/receive failure on a single connection
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValueObjectError),
}

impl RelayError {
    /// Close reason sent to a refused WebSocket client
    pub fn close_reason(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "Session not found",
            Self::SessionEnded(_) => "Session has ended",
            Self::SessionActive(_) => "Session is still active",
            Self::IdentityConflict(_) => IDENTITY_CONFLICT_REASON,
            Self::AuthError(_) => "Authentication failed",
            Self::Transport(_) => "Transport error",
            Self::InvalidInput(_) => "Invalid request",
        }
    }
}
