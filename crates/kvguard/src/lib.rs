//! Resilient key/value client stack.
//!
//! `kvguard` wraps a driver for a Redis-like store in the layers a
//! production service needs: an event-driven connection lifecycle,
//! per-command instrumentation with runtime-tunable logging, task-local
//! correlation context, and a multi-instance registry that substitutes a
//! failing proxy for instances that never came up. Each layer is
//! available as both an individual crate and a feature of this
//! meta-crate.
//!
//! # Layers
//!
//! - **Connection** (`connection` feature): state machine guarding
//!   command execution behind confirmed readiness, with linear backoff
//! - **Client** (`client` feature): typed command surface where every
//!   operation runs through one instrumented funnel
//! - **Context** (`context` feature): correlation ids that follow a
//!   request across task boundaries
//! - **Registry** (`registry` feature): one client per configured
//!   instance, broken declarations replaced by failing proxies
//! - **Memory** (`memory` feature): in-memory driver with failure
//!   injection for tests
//!
//! # Usage
//!
//! Enable the layers you need:
//!
//! ```toml
//! [dependencies]
//! kvguard = { version = "0.1", features = ["registry"] }
//! ```
//!
//! Or everything:
//!
//! ```toml
//! [dependencies]
//! kvguard = { version = "0.1", features = ["full"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "registry", feature = "memory"))]
//! # {
//! use std::sync::Arc;
//! use kvguard::core::{ClientError, InstanceConfig, RegistryConfig, StoreClient};
//! use kvguard::client::Commands;
//! use kvguard::memory::MemoryDriver;
//! use kvguard::registry::Registry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegistryConfig::new(vec![
//!     InstanceConfig::single("cache", "localhost", 6379),
//! ]);
//! let factory = |_: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
//!     Ok(Arc::new(MemoryDriver::new()))
//! };
//!
//! let registry = Registry::new(&config, &factory);
//! registry.get(None)?.set("greeting", "hello").await?;
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! # }
//! ```

/// Shared infrastructure: reply model, driver contract, errors, config.
pub mod core {
    pub use kvguard_core::*;
}

/// Instrumented command surface and pipelines.
#[cfg(feature = "client")]
pub mod client {
    pub use kvguard_client::*;
}

/// Connection lifecycle management.
#[cfg(feature = "connection")]
pub mod connection {
    pub use kvguard_connection::*;
}

/// Task-local correlation context.
#[cfg(feature = "context")]
pub mod context {
    pub use kvguard_context::*;
}

/// In-memory driver with failure injection.
#[cfg(feature = "memory")]
pub mod memory {
    pub use kvguard_memory::*;
}

/// Multi-instance registry.
#[cfg(feature = "registry")]
pub mod registry {
    pub use kvguard_registry::*;
}
