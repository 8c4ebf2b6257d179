//! Connection state for one managed instance.

use std::fmt;

/// The lifecycle state of one managed connection.
///
/// Once `Quit` is reached no transition back to `Connecting` or `Ready`
/// is permitted; the instance is permanently retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    Disconnected,

    /// A connection attempt is in flight.
    Connecting,

    /// Connected; commands may be dispatched.
    Ready,

    /// A graceful shutdown is in progress.
    Quitting,

    /// Permanently retired.
    Quit,
}

impl ConnectionState {
    /// Whether commands may be dispatched right now.
    pub fn is_ready(self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Whether the instance has been (or is being) retired.
    pub fn is_shutting_down(self) -> bool {
        matches!(self, ConnectionState::Quitting | ConnectionState::Quit)
    }

    /// Whether the terminal state has been reached.
    pub fn is_quit(self) -> bool {
        matches!(self, ConnectionState::Quit)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Quitting => "quitting",
            ConnectionState::Quit => "quit",
        };
        f.write_str(label)
    }
}
