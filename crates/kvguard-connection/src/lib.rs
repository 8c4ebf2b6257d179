//! Connection lifecycle management for the kvguard client stack.
//!
//! One [`ConnectionManager`] owns one underlying driver handle and
//! guarantees commands only execute once the connection is confirmed
//! ready. Readiness is event-driven: the manager bridges the driver's
//! lifecycle events into a single-shot shared future, so any number of
//! concurrent callers piggyback on one connection attempt.
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use kvguard_core::StoreClient;
//! use kvguard_connection::ConnectionManager;
//!
//! # async fn example(driver: Arc<dyn StoreClient>) -> Result<(), kvguard_core::ClientError> {
//! let manager = ConnectionManager::new("cache", driver);
//! manager.ensure_ready().await?;
//! assert!(manager.is_ready());
//! manager.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod manager;
mod policy;
mod state;

pub use manager::ConnectionManager;
pub use policy::ReconnectPolicy;
pub use state::ConnectionState;
