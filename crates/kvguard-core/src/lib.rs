//! Shared infrastructure for the kvguard resilient key/value client.
//!
//! This crate holds everything the other kvguard crates agree on:
//!
//! - [`Value`]: the untyped reply model drivers return
//! - [`Command`]: one store operation, name plus arguments
//! - [`StoreClient`]: the driver contract, including the lifecycle
//!   [`DriverEvent`]s every driver must emit
//! - [`ClientError`] / [`DriverError`]: the error taxonomy
//! - [`InstanceConfig`] and friends: per-instance configuration
//!
//! The wire protocol itself is out of scope; anything that can satisfy
//! [`StoreClient`] (a real network client, the in-memory driver from
//! `kvguard-memory`, a mock) plugs into the lifecycle and instrumentation
//! layers unchanged.

mod command;
mod config;
mod driver;
mod error;
mod value;

pub use command::Command;
pub use config::{
    Addr, CommandLogPolicy, ConnectionMode, InstanceConfig, LogLevel, LogPolicyUpdate,
    RegistryConfig, RetrySettings,
};
pub use driver::{DriverEvent, StoreClient};
pub use error::{ClientError, DriverError};
pub use value::Value;
