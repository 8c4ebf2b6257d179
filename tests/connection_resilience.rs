//! Connection lifecycle under contention and failure.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kvguard_client::{Commands, InstrumentedClient};
use kvguard_connection::{ConnectionManager, ConnectionState, ReconnectPolicy};
use kvguard_core::{ClientError, InstanceConfig, RetrySettings, StoreClient};
use kvguard_memory::MemoryDriver;

#[tokio::test]
async fn many_concurrent_callers_share_one_connect() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .connect_delay(Duration::from_millis(25))
            .build(),
    );
    let manager = Arc::new(ConnectionManager::new(
        "cache",
        driver.clone() as Arc<dyn StoreClient>,
    ));

    let attempts = (0..32).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.connect().await })
    });
    for outcome in join_all(attempts).await {
        outcome.unwrap().unwrap();
    }

    assert_eq!(driver.open_calls(), 1, "all callers joined one attempt");
    assert_eq!(manager.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn commands_connect_lazily_and_share_the_attempt() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .connect_delay(Duration::from_millis(25))
            .build(),
    );
    let config = InstanceConfig::single("cache", "localhost", 6379);
    let client = Arc::new(InstrumentedClient::new(
        &config,
        driver.clone() as Arc<dyn StoreClient>,
    ));

    let writes = (0..8).map(|i| {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.set(&format!("k{}", i), "v").await })
    });
    for outcome in join_all(writes).await {
        outcome.unwrap().unwrap();
    }

    assert_eq!(driver.open_calls(), 1);
}

#[tokio::test]
async fn driver_level_retries_are_invisible_to_callers() {
    let driver = MemoryDriver::builder()
        .fail_connects(3)
        .retry_strategy(|attempt| (attempt <= 5).then(|| Duration::from_millis(2)))
        .build();
    let config = InstanceConfig::single("cache", "localhost", 6379);
    let client = InstrumentedClient::new(&config, Arc::new(driver));

    // The caller just sees the command succeed once the driver gets there.
    client.set("k", "v").await.unwrap();
    assert_eq!(client.get("k").await.unwrap(), Some("v".to_string()));
}

#[tokio::test]
async fn terminal_connect_failure_is_reported_then_retryable() {
    let driver = MemoryDriver::builder().fail_connects(1).build();
    let config = InstanceConfig::single("cache", "localhost", 6379);
    let client = InstrumentedClient::new(&config, Arc::new(driver));

    let err = client.get("k").await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionFailed { .. }));

    // The failure cleared the pending attempt; the next command connects.
    assert_eq!(client.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn configured_backoff_drives_the_retry_schedule() {
    // The driver's retry schedule comes straight from the instance's
    // configured policy; a short budget keeps the test fast.
    let config = InstanceConfig::single("cache", "localhost", 6379).with_retry(RetrySettings {
        max_retries: 4,
        backoff_step_ms: 2,
        backoff_cap_ms: 6,
    });
    let policy = ReconnectPolicy::for_mode(&config.mode, &config.retry);
    let driver = MemoryDriver::builder()
        .fail_connects(3)
        .retry_strategy(move |attempt| policy.delay_for_attempt(attempt))
        .build();
    let client = InstrumentedClient::new(&config, Arc::new(driver));

    client.set("k", "v").await.unwrap();
    assert_eq!(client.get("k").await.unwrap(), Some("v".to_string()));

    // The same policy with the budget exceeded fails terminally.
    let policy = ReconnectPolicy::for_mode(&config.mode, &config.retry);
    let driver = MemoryDriver::builder()
        .fail_connects(5)
        .retry_strategy(move |attempt| policy.delay_for_attempt(attempt))
        .build();
    let client = InstrumentedClient::new(&config, Arc::new(driver));

    let err = client.get("k").await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionFailed { .. }));
}

#[tokio::test]
async fn quit_during_a_pending_connect_aborts_it() {
    let driver = MemoryDriver::builder()
        .connect_delay(Duration::from_secs(30))
        .build();
    let config = InstanceConfig::single("cache", "localhost", 6379);
    let client = Arc::new(InstrumentedClient::new(&config, Arc::new(driver)));

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get("k").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.quit().await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::ConnectionAborted { .. }));

    // And the client stays retired.
    assert!(client.get("k").await.unwrap_err().is_retired());
}
