//! Multi-instance registry for the kvguard client stack.
//!
//! A [`Registry`] is built once from a [`RegistryConfig`](kvguard_core::RegistryConfig)
//! and a [`DriverFactory`], and hands out `Arc<dyn Commands>` handles by
//! instance name. Construction never fails: instances whose driver could
//! not be built are registered behind a [`FailingClient`] that reports
//! the captured failure on every use.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use kvguard_client::Commands;
//! use kvguard_core::{ClientError, InstanceConfig, RegistryConfig, StoreClient};
//! use kvguard_memory::MemoryDriver;
//! use kvguard_registry::Registry;
//!
//! let config = RegistryConfig::new(vec![
//!     InstanceConfig::single("cache", "localhost", 6379),
//! ]);
//! let factory = |_: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
//!     Ok(Arc::new(MemoryDriver::new()))
//! };
//!
//! let registry = Registry::new(&config, &factory);
//! let cache = registry.get(None)?;
//! cache.set("greeting", "hello").await?;
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod factory;
mod failing;
mod registry;

pub use factory::DriverFactory;
pub use failing::FailingClient;
pub use registry::{Registry, RegistryError};
