//! The multi-instance registry.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use kvguard_client::{Commands, InstrumentedClient};
use kvguard_core::{LogPolicyUpdate, RegistryConfig};
use tracing::{error, info, warn};

use crate::factory::DriverFactory;
use crate::failing::FailingClient;

/// Errors from registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No instance is registered under the requested name.
    #[error("unknown instance '{name}'")]
    UnknownInstance {
        /// The requested name.
        name: String,
    },

    /// The registry was built from an empty configuration; there is no
    /// default to resolve.
    #[error("registry has no instances")]
    Empty,
}

/// Holds one client per declared instance and resolves the default.
///
/// Construction never fails: an instance whose driver cannot be built is
/// registered behind a [`FailingClient`] that reports the captured
/// failure on every use, so one broken declaration cannot take down the
/// instances that did come up.
///
/// The default instance is resolved once, at construction:
/// the explicitly configured default if its client was constructed,
/// otherwise the first declared instance that was, otherwise the first
/// declared instance at all.
pub struct Registry {
    clients: HashMap<String, Arc<dyn Commands>>,
    default: Option<String>,
    declared: Vec<String>,
}

impl Registry {
    /// Builds a client for every declared instance.
    ///
    /// Spawns lifecycle watchers, so a Tokio runtime must be current.
    /// Nothing connects until instances are used (or
    /// [`connect_all`](Registry::connect_all) is called).
    pub fn new(config: &RegistryConfig, factory: &dyn DriverFactory) -> Self {
        let mut clients: HashMap<String, Arc<dyn Commands>> = HashMap::new();
        let mut declared = Vec::with_capacity(config.instances.len());
        let mut constructed = Vec::new();

        for instance in &config.instances {
            let name = instance.name.clone();
            if clients.contains_key(&name) {
                error!(instance = %name, "duplicate instance declaration");
                clients.insert(
                    name.clone(),
                    Arc::new(FailingClient::new(&name, "duplicate instance declaration")),
                );
                // The earlier declaration's client was just replaced by the
                // proxy, so the name must not win default resolution either.
                constructed.retain(|kept| kept != &name);
                continue;
            }
            declared.push(name.clone());

            match factory.build(instance) {
                Ok(driver) => {
                    clients.insert(
                        name.clone(),
                        Arc::new(InstrumentedClient::new(instance, driver)),
                    );
                    constructed.push(name);
                }
                Err(err) => {
                    error!(instance = %name, error = %err, "instance construction failed, registering failing proxy");
                    clients.insert(name.clone(), Arc::new(FailingClient::new(&name, &err)));
                }
            }
        }

        let default = resolve_default(config, &constructed, &declared);
        match &default {
            Some(name) => info!(default_instance = %name, instances = declared.len(), "registry built"),
            None => warn!("registry built with no instances"),
        }

        Self {
            clients,
            default,
            declared,
        }
    }

    /// Looks up an instance, or the default when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn Commands>, RegistryError> {
        let name = match name {
            Some(name) => name,
            None => self.default.as_deref().ok_or(RegistryError::Empty)?,
        };
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownInstance {
                name: name.to_string(),
            })
    }

    /// The resolved default instance name, if any.
    pub fn default_instance(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Declared instance names, in declaration order.
    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Applies a logging-policy update to one instance.
    pub fn update_instance_config(
        &self,
        name: &str,
        update: &LogPolicyUpdate,
    ) -> Result<(), RegistryError> {
        self.get(Some(name))?.update_log_policy(update);
        Ok(())
    }

    /// Connects every instance concurrently.
    ///
    /// Failures are logged and swallowed; instances also connect lazily
    /// on first use, so this is a warm-up, not a gate.
    pub async fn connect_all(&self) {
        let attempts = self.clients.values().map(|client| async move {
            if let Err(err) = client.connect().await {
                warn!(instance = %client.instance_name(), error = %err, "warm-up connect failed");
            }
        });
        join_all(attempts).await;
    }

    /// Retires every instance.
    ///
    /// Each instance shuts down independently; a failure in one is
    /// logged and never prevents the others from closing.
    pub async fn shutdown(&self) {
        let closing = self.clients.values().map(|client| async move {
            if let Err(err) = client.quit().await {
                error!(instance = %client.instance_name(), error = %err, "shutdown failed");
            }
        });
        join_all(closing).await;
        info!(instances = self.clients.len(), "registry shut down");
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("instances", &self.declared)
            .field("default", &self.default)
            .finish()
    }
}

fn resolve_default(
    config: &RegistryConfig,
    constructed: &[String],
    declared: &[String],
) -> Option<String> {
    if let Some(explicit) = &config.default_instance {
        if constructed.iter().any(|name| name == explicit) {
            return Some(explicit.clone());
        }
        warn!(
            default_instance = %explicit,
            "configured default was not constructed, falling back"
        );
    }
    constructed
        .first()
        .or_else(|| declared.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvguard_core::{ClientError, InstanceConfig, StoreClient};
    use kvguard_memory::MemoryDriver;

    fn in_memory(_config: &InstanceConfig) -> Result<Arc<dyn StoreClient>, ClientError> {
        Ok(Arc::new(MemoryDriver::new()))
    }

    fn two_instances() -> RegistryConfig {
        RegistryConfig::new(vec![
            InstanceConfig::single("cache", "localhost", 6379),
            InstanceConfig::single("sessions", "localhost", 6380),
        ])
    }

    #[tokio::test]
    async fn default_is_the_first_declared_instance() {
        let registry = Registry::new(&two_instances(), &in_memory);
        assert_eq!(registry.default_instance(), Some("cache"));

        let client = registry.get(None).unwrap();
        assert_eq!(client.instance_name(), "cache");
    }

    #[tokio::test]
    async fn explicit_default_wins() {
        let config = two_instances().with_default("sessions");
        let registry = Registry::new(&config, &in_memory);
        assert_eq!(registry.default_instance(), Some("sessions"));
    }

    #[tokio::test]
    async fn unknown_instance_is_an_error() {
        let registry = Registry::new(&two_instances(), &in_memory);
        let err = registry.get(Some("nope")).err().unwrap();
        assert_eq!(
            err,
            RegistryError::UnknownInstance {
                name: "nope".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_registry_has_no_default() {
        let registry = Registry::new(&RegistryConfig::default(), &in_memory);
        assert_eq!(registry.default_instance(), None);
        assert_eq!(registry.get(None).err().unwrap(), RegistryError::Empty);
    }

    #[tokio::test]
    async fn construction_failure_registers_a_failing_proxy() {
        let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
            if config.name == "sessions" {
                Err(ClientError::connection_failed(&config.name, "no route"))
            } else {
                Ok(Arc::new(MemoryDriver::new()))
            }
        };
        let registry = Registry::new(&two_instances(), &factory);

        // The broken instance is still addressable and fails loudly.
        let sessions = registry.get(Some("sessions")).unwrap();
        let err = sessions.get("k").await.unwrap_err();
        assert!(err.is_not_initialized());
        assert!(!sessions.is_healthy().await);

        // The healthy one is untouched.
        let cache = registry.get(Some("cache")).unwrap();
        cache.set("k", "v").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn broken_explicit_default_falls_back_to_first_constructed() {
        let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
            if config.name == "cache" {
                Err(ClientError::connection_failed(&config.name, "no route"))
            } else {
                Ok(Arc::new(MemoryDriver::new()))
            }
        };
        let config = two_instances().with_default("cache");
        let registry = Registry::new(&config, &factory);
        assert_eq!(registry.default_instance(), Some("sessions"));
    }

    #[tokio::test]
    async fn duplicate_declarations_become_failing_proxies() {
        let config = RegistryConfig::new(vec![
            InstanceConfig::single("cache", "localhost", 6379),
            InstanceConfig::single("cache", "localhost", 6380),
        ]);
        let registry = Registry::new(&config, &in_memory);

        let client = registry.get(Some("cache")).unwrap();
        let err = client.get("k").await.unwrap_err();
        assert!(err.is_not_initialized());
        assert!(err.to_string().contains("duplicate"));
    }

    #[tokio::test]
    async fn duplicated_name_cannot_be_the_default() {
        let config = RegistryConfig::new(vec![
            InstanceConfig::single("cache", "localhost", 6379),
            InstanceConfig::single("cache", "localhost", 6380),
            InstanceConfig::single("sessions", "localhost", 6381),
        ]);
        let registry = Registry::new(&config, &in_memory);

        // The poisoned name falls out of default resolution; the default
        // must land on an instance that actually works.
        assert_eq!(registry.default_instance(), Some("sessions"));
        let client = registry.get(None).unwrap();
        client.set("k", "v").await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_retires_every_instance() {
        let registry = Registry::new(&two_instances(), &in_memory);
        registry.connect_all().await;
        registry.shutdown().await;

        for name in ["cache", "sessions"] {
            let client = registry.get(Some(name)).unwrap();
            let err = client.get("k").await.unwrap_err();
            assert!(err.is_retired(), "{} should be retired", name);
        }
    }

    #[tokio::test]
    async fn shutdown_tolerates_failing_proxies() {
        let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
            if config.name == "sessions" {
                Err(ClientError::connection_failed(&config.name, "no route"))
            } else {
                Ok(Arc::new(MemoryDriver::new()))
            }
        };
        let registry = Registry::new(&two_instances(), &factory);
        registry.connect_all().await;
        // Must complete despite the never-initialized instance.
        registry.shutdown().await;

        let cache = registry.get(Some("cache")).unwrap();
        assert!(cache.get("k").await.unwrap_err().is_retired());
    }

    #[tokio::test]
    async fn shutdown_continues_past_a_rejected_quit() {
        let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
            if config.name == "cache" {
                Ok(Arc::new(MemoryDriver::builder().fail_close().build()))
            } else {
                Ok(Arc::new(MemoryDriver::new()))
            }
        };
        let registry = Registry::new(&two_instances(), &factory);
        registry.connect_all().await;
        registry.shutdown().await;

        // Both end up retired even though one quit reported an error.
        for name in ["cache", "sessions"] {
            let client = registry.get(Some(name)).unwrap();
            let err = client.get("k").await.unwrap_err();
            assert!(err.is_retired(), "{} should be retired", name);
        }
    }

    #[tokio::test]
    async fn policy_updates_route_to_the_named_instance() {
        let registry = Registry::new(&two_instances(), &in_memory);
        registry
            .update_instance_config("cache", &LogPolicyUpdate::default())
            .unwrap();

        let err = registry
            .update_instance_config("nope", &LogPolicyUpdate::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownInstance { .. }));
    }
}
