//! The in-memory `StoreClient` implementation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kvguard_core::{Command, DriverError, DriverEvent, StoreClient, Value};
use tokio::sync::broadcast;

use crate::store::Store;

/// Retry schedule for injected connect failures: attempt number in,
/// delay out, `None` meaning give up.
type RetryStrategy = Arc<dyn Fn(u32) -> Option<Duration> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Open,
    Closed,
}

struct DriverInner {
    phase: Mutex<Phase>,
    store: Mutex<Store>,
    events: broadcast::Sender<DriverEvent>,
    open_calls: AtomicUsize,
    remaining_connect_failures: AtomicU32,
    connect_delay: Duration,
    failing_commands: HashSet<String>,
    fail_close: bool,
    retry_strategy: Option<RetryStrategy>,
}

impl DriverInner {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DriverEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }
}

/// An in-memory driver satisfying the full `StoreClient` contract.
///
/// Lifecycle behaves like a networked client: `open` returns immediately
/// and progress arrives as events; commands fail with
/// [`DriverError::Closed`] until `Ready` has been emitted. The failure
/// injection knobs on [`MemoryDriverBuilder`] make the unhappy paths
/// reproducible.
#[derive(Clone)]
pub struct MemoryDriver {
    inner: Arc<DriverInner>,
}

impl MemoryDriver {
    /// A driver that connects instantly and never fails.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a driver.
    pub fn builder() -> MemoryDriverBuilder {
        MemoryDriverBuilder::default()
    }

    /// How many connection attempt sequences have been initiated.
    ///
    /// Internal retries driven by the retry strategy count as one
    /// sequence; this is the number callers use to assert that
    /// concurrent `connect()`s deduplicated onto one attempt.
    pub fn open_calls(&self) -> usize {
        self.inner.open_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StoreClient for MemoryDriver {
    fn open(&self) {
        {
            let mut phase = self.inner.phase();
            match *phase {
                Phase::Connecting | Phase::Open => return,
                Phase::Idle | Phase::Closed => *phase = Phase::Connecting,
            }
        }
        self.inner.open_calls.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.emit(DriverEvent::Connect);
            tokio::time::sleep(inner.connect_delay).await;

            let mut attempt = 0u32;
            loop {
                if *inner.phase() != Phase::Connecting {
                    // close() raced the attempt; stop quietly.
                    return;
                }

                let should_fail = inner
                    .remaining_connect_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                        left.checked_sub(1)
                    })
                    .is_ok();
                if !should_fail {
                    *inner.phase() = Phase::Open;
                    inner.emit(DriverEvent::Ready);
                    return;
                }

                attempt += 1;
                let delay = inner
                    .retry_strategy
                    .as_ref()
                    .and_then(|strategy| strategy(attempt));
                match delay {
                    Some(delay) => {
                        inner.emit(DriverEvent::Reconnecting {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        });
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        *inner.phase() = Phase::Closed;
                        inner.emit(DriverEvent::Error(
                            "simulated connection failure".to_string(),
                        ));
                        return;
                    }
                }
            }
        });
    }

    fn is_open(&self) -> bool {
        *self.inner.phase() == Phase::Open
    }

    fn events(&self) -> broadcast::Receiver<DriverEvent> {
        self.inner.events.subscribe()
    }

    async fn dispatch(&self, command: Command) -> Result<Value, DriverError> {
        if !self.is_open() {
            return Err(DriverError::Closed);
        }
        if self.inner.failing_commands.contains(command.name()) {
            return Err(DriverError::Io(format!(
                "injected failure for {}",
                command.name()
            )));
        }
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(&command)
    }

    async fn ping(&self) -> Result<(), DriverError> {
        self.dispatch(Command::new("PING")).await.map(|_| ())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if self.inner.fail_close {
            return Err(DriverError::Io("injected failure for close".to_string()));
        }
        let was_open = {
            let mut phase = self.inner.phase();
            let was_open = *phase == Phase::Open;
            *phase = Phase::Closed;
            was_open
        };
        if was_open {
            self.inner.emit(DriverEvent::End);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("phase", &*self.inner.phase())
            .field("open_calls", &self.open_calls())
            .finish()
    }
}

/// Builder for a [`MemoryDriver`].
#[derive(Default)]
pub struct MemoryDriverBuilder {
    connect_delay: Option<Duration>,
    fail_connects: u32,
    failing_commands: HashSet<String>,
    fail_close: bool,
    retry_strategy: Option<RetryStrategy>,
}

impl MemoryDriverBuilder {
    /// Time each connection attempt takes before settling.
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Fails the first `count` connection tries. Without a retry
    /// strategy each failed try terminates its attempt sequence with an
    /// error event.
    pub fn fail_connects(mut self, count: u32) -> Self {
        self.fail_connects = count;
        self
    }

    /// Makes every dispatch of the named command fail with an I/O error.
    pub fn fail_command(mut self, name: impl Into<String>) -> Self {
        self.failing_commands.insert(name.into());
        self
    }

    /// Makes `close` fail with an I/O error, leaving the connection in
    /// whatever phase it was in.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Installs an internal retry schedule, the way drivers for
    /// reconnect-capable topologies do: failed tries emit
    /// `Reconnecting` and are retried after the returned delay, until
    /// the strategy returns `None`.
    pub fn retry_strategy<F>(mut self, strategy: F) -> Self
    where
        F: Fn(u32) -> Option<Duration> + Send + Sync + 'static,
    {
        self.retry_strategy = Some(Arc::new(strategy));
        self
    }

    /// Builds the driver.
    pub fn build(self) -> MemoryDriver {
        let (events, _) = broadcast::channel(64);
        MemoryDriver {
            inner: Arc::new(DriverInner {
                phase: Mutex::new(Phase::Idle),
                store: Mutex::new(Store::default()),
                events,
                open_calls: AtomicUsize::new(0),
                remaining_connect_failures: AtomicU32::new(self.fail_connects),
                connect_delay: self.connect_delay.unwrap_or(Duration::ZERO),
                failing_commands: self.failing_commands,
                fail_close: self.fail_close,
                retry_strategy: self.retry_strategy,
            }),
        }
    }
}
