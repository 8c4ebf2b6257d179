//! Registry behavior across whole-stack scenarios: failing-proxy
//! transparency, shutdown isolation, default resolution.

mod support;

use std::sync::Arc;

use kvguard_client::Commands;
use kvguard_core::{ClientError, InstanceConfig, RegistryConfig, StoreClient};
use kvguard_memory::MemoryDriver;
use kvguard_registry::Registry;
use support::LogCapture;
use tracing::Level;

fn in_memory(_: &InstanceConfig) -> Result<Arc<dyn StoreClient>, ClientError> {
    Ok(Arc::new(MemoryDriver::new()))
}

fn config() -> RegistryConfig {
    RegistryConfig::new(vec![
        InstanceConfig::single("cache", "localhost", 6379),
        InstanceConfig::single("sessions", "localhost", 6380),
    ])
}

#[tokio::test]
async fn instances_are_fully_isolated() {
    let registry = Registry::new(&config(), &in_memory);

    let cache = registry.get(Some("cache")).unwrap();
    let sessions = registry.get(Some("sessions")).unwrap();

    cache.set("k", "from-cache").await.unwrap();
    assert_eq!(sessions.get("k").await.unwrap(), None, "separate keyspaces");

    // Retiring one instance leaves the other fully usable.
    cache.quit().await.unwrap();
    assert!(cache.get("k").await.unwrap_err().is_retired());
    sessions.set("k", "still-alive").await.unwrap();
}

#[tokio::test]
async fn callers_cannot_tell_a_failing_proxy_from_a_client() {
    let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
        if config.name == "sessions" {
            Err(ClientError::connection_failed(&config.name, "dns failure"))
        } else {
            Ok(Arc::new(MemoryDriver::new()))
        }
    };
    let registry = Registry::new(&config(), &factory);

    // Same surface, same lookup path; only the outcome differs.
    let handles: Vec<Arc<dyn Commands>> = registry
        .instance_names()
        .map(|name| registry.get(Some(name)).unwrap())
        .collect();
    assert_eq!(handles.len(), 2);

    for handle in &handles {
        match handle.instance_name() {
            "cache" => handle.set("k", "v").await.unwrap(),
            "sessions" => {
                let err = handle.set("k", "v").await.unwrap_err();
                assert!(err.is_not_initialized());
                assert!(err.to_string().contains("dns failure"));
            }
            other => panic!("unexpected instance {}", other),
        }
    }
}

#[tokio::test]
async fn failing_proxies_warn_on_every_refused_command() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
        Err(ClientError::connection_failed(&config.name, "down"))
    };
    let registry = Registry::new(&config(), &factory);

    let cache = registry.get(Some("cache")).unwrap();
    cache.get("k").await.unwrap_err();

    let warnings: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|event| event.level == Level::WARN && event.field("command") == Some("GET"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("instance"), Some("cache"));
    assert_eq!(warnings[0].field("params"), Some("k"));
}

#[tokio::test]
async fn shutdown_survives_partially_broken_registries() {
    let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
        if config.name == "cache" {
            Err(ClientError::connection_failed(&config.name, "down"))
        } else {
            Ok(Arc::new(MemoryDriver::new()))
        }
    };
    let registry = Registry::new(&config(), &factory);
    registry.connect_all().await;

    registry.shutdown().await;

    let sessions = registry.get(Some("sessions")).unwrap();
    assert!(sessions.get("k").await.unwrap_err().is_retired());
    // A second shutdown is harmless.
    registry.shutdown().await;
}

#[tokio::test]
async fn shutdown_logs_a_rejected_quit_and_keeps_going() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
        if config.name == "cache" {
            Ok(Arc::new(MemoryDriver::builder().fail_close().build()))
        } else {
            Ok(Arc::new(MemoryDriver::new()))
        }
    };
    let registry = Registry::new(&config(), &factory);
    registry.connect_all().await;
    registry.shutdown().await;

    // The rejected quit is reported, not swallowed silently.
    let failures: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|event| event.level == Level::ERROR && event.message() == "shutdown failed")
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field("instance"), Some("cache"));

    // And neither instance escaped retirement.
    for name in ["cache", "sessions"] {
        let client = registry.get(Some(name)).unwrap();
        assert!(client.get("k").await.unwrap_err().is_retired());
    }
}

#[tokio::test]
async fn default_falls_back_past_a_broken_explicit_choice() {
    let factory = |config: &InstanceConfig| -> Result<Arc<dyn StoreClient>, ClientError> {
        if config.name == "cache" {
            Err(ClientError::connection_failed(&config.name, "down"))
        } else {
            Ok(Arc::new(MemoryDriver::new()))
        }
    };
    let registry = Registry::new(&config().with_default("cache"), &factory);

    let client = registry.get(None).unwrap();
    assert_eq!(client.instance_name(), "sessions");
    client.set("k", "v").await.unwrap();
}
