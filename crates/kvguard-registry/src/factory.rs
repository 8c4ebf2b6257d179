//! Driver construction, abstracted behind a factory.

use std::sync::Arc;

use kvguard_core::{ClientError, InstanceConfig, StoreClient};

/// Builds a driver handle for one instance configuration.
///
/// The registry calls this once per declared instance. A failure here is
/// not fatal to registry construction: the instance is registered behind
/// a failing proxy instead.
///
/// Any suitable closure works:
///
/// ```
/// use std::sync::Arc;
/// use kvguard_core::{ClientError, InstanceConfig, StoreClient};
/// use kvguard_memory::MemoryDriver;
/// use kvguard_registry::DriverFactory;
///
/// fn in_memory() -> impl DriverFactory {
///     |_config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
///         Ok(Arc::new(MemoryDriver::new()))
///     }
/// }
/// # let _ = in_memory();
/// ```
pub trait DriverFactory: Send + Sync {
    /// Builds a driver for the given instance.
    fn build(&self, config: &InstanceConfig) -> Result<Arc<dyn StoreClient>, ClientError>;
}

impl<F> DriverFactory for F
where
    F: Fn(&InstanceConfig) -> Result<Arc<dyn StoreClient>, ClientError> + Send + Sync,
{
    fn build(&self, config: &InstanceConfig) -> Result<Arc<dyn StoreClient>, ClientError> {
        self(config)
    }
}
