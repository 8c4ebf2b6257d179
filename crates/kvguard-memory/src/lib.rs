//! In-memory driver for the kvguard client stack.
//!
//! [`MemoryDriver`] implements the [`StoreClient`](kvguard_core::StoreClient)
//! contract against a process-local keyspace: typed entries, per-key
//! expiry, and the full lifecycle event sequence a networked driver would
//! emit. Failure injection knobs make connection failures, retries, and
//! command-level errors reproducible in tests without a network:
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::time::Duration;
//! use kvguard_memory::MemoryDriver;
//!
//! let driver = MemoryDriver::builder()
//!     .fail_connects(2)
//!     .retry_strategy(|attempt| (attempt <= 5).then(|| Duration::from_millis(5)))
//!     .build();
//! # drop(driver);
//! # }
//! ```

mod driver;
mod store;

pub use driver::{MemoryDriver, MemoryDriverBuilder};
