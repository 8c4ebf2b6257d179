//! The driver contract: what an underlying store client must provide.

use crate::command::Command;
use crate::error::DriverError;
use crate::value::Value;
use tokio::sync::broadcast;

/// Lifecycle events a driver emits while managing its connection.
///
/// The connection lifecycle manager subscribes to these and never polls
/// the driver for state; readiness is entirely event-driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The transport-level connection has been initiated.
    Connect,

    /// The connection is established and commands may be dispatched.
    Ready,

    /// Something went wrong. While a connect is pending this rejects the
    /// pending attempt; afterwards it is informational.
    Error(String),

    /// The connection ended (peer closed, local close, or gave up).
    End,

    /// The driver is about to retry the connection.
    Reconnecting {
        /// 1-based retry counter.
        attempt: u32,
        /// Delay before the retry, in milliseconds.
        delay_ms: u64,
    },
}

/// An underlying store client, treated as an opaque collaborator.
///
/// The contract mirrors event-emitting database clients: [`open`] begins
/// connecting and returns immediately, with progress reported through
/// [`events`]; [`dispatch`] issues one command against an established
/// connection; [`close`] performs a graceful shutdown.
///
/// Implementations own their transport completely. Reconnection (for
/// topologies that support it) happens inside the driver, surfaced as
/// [`DriverEvent::Reconnecting`] followed by [`DriverEvent::Ready`] or
/// [`DriverEvent::Error`].
///
/// [`open`]: StoreClient::open
/// [`events`]: StoreClient::events
/// [`dispatch`]: StoreClient::dispatch
/// [`close`]: StoreClient::close
#[async_trait::async_trait]
pub trait StoreClient: Send + Sync {
    /// Begins connecting. Idempotent; a driver that is already open or
    /// already connecting ignores the call.
    fn open(&self);

    /// Whether the connection is currently established.
    fn is_open(&self) -> bool;

    /// Subscribes to lifecycle events. Each subscriber gets every event
    /// emitted after the subscription.
    fn events(&self) -> broadcast::Receiver<DriverEvent>;

    /// Dispatches one command and returns its raw reply.
    async fn dispatch(&self, command: Command) -> Result<Value, DriverError>;

    /// Liveness probe against the established connection.
    async fn ping(&self) -> Result<(), DriverError>;

    /// Gracefully closes the connection. Emits [`DriverEvent::End`].
    async fn close(&self) -> Result<(), DriverError>;
}
