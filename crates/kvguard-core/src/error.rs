//! Error taxonomy for the kvguard client stack.
//!
//! [`DriverError`] is what a [`StoreClient`](crate::StoreClient)
//! implementation reports; [`ClientError`] is what callers of the
//! lifecycle manager, instrumented client, and registry see. Both are
//! `Clone`: a pending connection is represented as a shared future whose
//! outcome is handed to every concurrent waiter.

use crate::value::Value;

/// Errors reported by a driver implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// A transport-level failure (socket errors, resets, timeouts).
    #[error("i/o error: {0}")]
    Io(String),

    /// The store answered with something the caller cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The key exists but holds a different data type than the command
    /// operates on.
    #[error("wrong type for {command}")]
    WrongType {
        /// The command that hit the mismatch.
        command: String,
    },

    /// The driver does not implement this command.
    #[error("unsupported command: {0}")]
    Unsupported(String),

    /// The connection is closed; no command can be dispatched.
    #[error("connection closed")]
    Closed,
}

impl DriverError {
    /// Protocol error for a reply that does not have the expected shape.
    pub fn unexpected_reply(expected: &str, got: &Value) -> Self {
        DriverError::Protocol(format!("expected {} reply, got {}", expected, got.kind()))
    }
}

/// Errors surfaced by the kvguard client stack.
///
/// Every variant names the logical instance it belongs to, so a log line
/// or rejection is attributable without further context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// An operation was attempted after `disconnect()`; permanent.
    #[error("client for instance '{instance}' has been retired")]
    ClientRetired {
        /// The retired instance.
        instance: String,
    },

    /// A pending connect was cancelled by a concurrent `disconnect()`.
    #[error("pending connection for instance '{instance}' was aborted")]
    ConnectionAborted {
        /// The instance whose connect was cancelled.
        instance: String,
    },

    /// The underlying connect attempt failed.
    #[error("connection to instance '{instance}' failed: {reason}")]
    ConnectionFailed {
        /// The instance that failed to connect.
        instance: String,
        /// The underlying failure, rendered.
        reason: String,
    },

    /// The store rejected one specific command; never retried here.
    #[error("command {command} failed on instance '{instance}': {reason}")]
    CommandFailed {
        /// The instance the command ran against.
        instance: String,
        /// The command word.
        command: String,
        /// The underlying failure, rendered.
        reason: String,
    },

    /// The instance never finished construction; raised only by a
    /// failing proxy standing in for it.
    #[error("instance '{instance}' was not initialized: {reason}")]
    NotInitialized {
        /// The declared but unusable instance.
        instance: String,
        /// The captured construction-time failure.
        reason: String,
    },
}

impl ClientError {
    /// Shorthand for [`ClientError::ClientRetired`].
    pub fn retired(instance: impl Into<String>) -> Self {
        ClientError::ClientRetired {
            instance: instance.into(),
        }
    }

    /// Shorthand for [`ClientError::ConnectionAborted`].
    pub fn aborted(instance: impl Into<String>) -> Self {
        ClientError::ConnectionAborted {
            instance: instance.into(),
        }
    }

    /// Shorthand for [`ClientError::ConnectionFailed`].
    pub fn connection_failed(instance: impl Into<String>, reason: impl ToString) -> Self {
        ClientError::ConnectionFailed {
            instance: instance.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`ClientError::CommandFailed`].
    pub fn command_failed(
        instance: impl Into<String>,
        command: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        ClientError::CommandFailed {
            instance: instance.into(),
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`ClientError::NotInitialized`].
    pub fn not_initialized(instance: impl Into<String>, reason: impl ToString) -> Self {
        ClientError::NotInitialized {
            instance: instance.into(),
            reason: reason.to_string(),
        }
    }

    /// The instance this error belongs to.
    pub fn instance(&self) -> &str {
        match self {
            ClientError::ClientRetired { instance }
            | ClientError::ConnectionAborted { instance }
            | ClientError::ConnectionFailed { instance, .. }
            | ClientError::CommandFailed { instance, .. }
            | ClientError::NotInitialized { instance, .. } => instance,
        }
    }

    /// Returns `true` if the instance is permanently retired.
    pub fn is_retired(&self) -> bool {
        matches!(self, ClientError::ClientRetired { .. })
    }

    /// Returns `true` for a construction-time (proxy) failure.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, ClientError::NotInitialized { .. })
    }
}
