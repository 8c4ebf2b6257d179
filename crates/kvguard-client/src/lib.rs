//! Instrumented command surface for the kvguard client stack.
//!
//! [`InstrumentedClient`] wraps a connection manager and a command
//! executor so every operation runs through one funnel: confirm
//! readiness, execute, emit a structured log entry with the command word,
//! instance name, duration, and ambient correlation id. The [`Commands`]
//! trait is the object-safe surface callers hold, letting a registry hand
//! out `Arc<dyn Commands>` for healthy and failed instances alike.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), kvguard_core::ClientError> {
//! use std::sync::Arc;
//! use kvguard_client::{Commands, InstrumentedClient};
//! use kvguard_core::InstanceConfig;
//! use kvguard_memory::MemoryDriver;
//!
//! let config = InstanceConfig::single("cache", "localhost", 6379);
//! let client = InstrumentedClient::new(&config, Arc::new(MemoryDriver::new()));
//!
//! client.set("greeting", "hello").await?;
//! assert_eq!(client.get("greeting").await?, Some("hello".to_string()));
//! # Ok(())
//! # }
//! ```
//!
//! With the `metrics` feature enabled, the same funnel also records a
//! per-command counter and duration histogram.

mod client;
mod commands;
mod executor;
mod log;
mod pipeline;

pub use client::InstrumentedClient;
pub use commands::Commands;
pub use executor::CommandExecutor;
pub use pipeline::Pipeline;
