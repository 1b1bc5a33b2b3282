//! Error types for the terminal client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Client ID is already bound to an open connection in the session
    #[error("Client ID '{0}' is already in use")]
    IdentityConflict(String),

    /// The relay refused the connection (unknown or ended session, wrong password)
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Gave up after {0} reconnection attempts")]
    ReconnectExhausted(u32),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
