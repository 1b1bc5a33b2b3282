//! Tunables of the relay behaviour shared by the usecases.

use std::time::Duration;

/// Relay policy, resolved from configuration at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPolicy {
    /// Emit a `system` "has left the room" message when a participant unregisters
    pub announce_leave: bool,
    /// Duplicate-join guard used by participant replay (milliseconds)
    pub rejoin_window_ms: i64,
    /// Time between `session_end` and the forced close of remaining sockets
    pub close_grace_period: Duration,
    /// Maximum message body length in characters
    pub max_message_length: usize,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            announce_leave: false,
            rejoin_window_ms: 1_000,
            close_grace_period: Duration::from_millis(3_000),
            max_message_length: 4_000,
        }
    }
}
