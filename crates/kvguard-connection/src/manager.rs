//! The connection lifecycle manager.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use kvguard_core::{ClientError, DriverEvent, StoreClient};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::ConnectionState;

type SharedConnect = Shared<BoxFuture<'static, Result<(), ClientError>>>;

/// An in-flight connection attempt.
///
/// At most one exists per manager. `settle` is the single-shot
/// resolve/reject hook the event watcher fires; `shared` is what every
/// concurrent caller awaits.
struct PendingConnection {
    shared: SharedConnect,
    settle: Option<oneshot::Sender<Result<(), ClientError>>>,
}

struct Inner {
    state: ConnectionState,
    pending: Option<PendingConnection>,
}

/// Owns one underlying driver handle and guards command execution behind
/// confirmed readiness.
///
/// The manager is the only component allowed to mutate lifecycle state.
/// Other layers hold non-owning references to the driver handle (via
/// [`client_handle`](ConnectionManager::client_handle)) and must never
/// connect, close, or otherwise interfere with it.
///
/// Construction spawns an event-watcher task, so a Tokio runtime must be
/// current.
pub struct ConnectionManager {
    instance: String,
    driver: Arc<dyn StoreClient>,
    inner: Arc<Mutex<Inner>>,
    watcher: JoinHandle<()>,
}

impl ConnectionManager {
    /// Creates a manager for the given instance name and driver.
    ///
    /// The driver's lifecycle events are consumed from this point on;
    /// nothing is connected until [`connect`](ConnectionManager::connect)
    /// is called.
    pub fn new(instance: impl Into<String>, driver: Arc<dyn StoreClient>) -> Self {
        let instance = instance.into();
        let inner = Arc::new(Mutex::new(Inner {
            state: ConnectionState::Disconnected,
            pending: None,
        }));
        // Subscribe before spawning so no event can slip past the watcher.
        let watcher = tokio::spawn(watch_events(
            instance.clone(),
            driver.events(),
            Arc::clone(&driver),
            Arc::clone(&inner),
        ));
        Self {
            instance,
            driver,
            inner,
            watcher,
        }
    }

    /// The instance this manager belongs to.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// A non-owning reference to the underlying driver handle, for the
    /// command execution layer.
    pub fn client_handle(&self) -> Arc<dyn StoreClient> {
        Arc::clone(&self.driver)
    }

    /// Connects, or joins the connection attempt already in flight.
    ///
    /// - `Quit`: fails immediately with [`ClientError::ClientRetired`].
    /// - `Ready`: resolves immediately.
    /// - pending attempt: awaits the same shared outcome; no second
    ///   underlying connect is issued.
    /// - otherwise: initiates the underlying connect and awaits the
    ///   driver's `Ready`/`Error` event.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let shared = {
            let mut inner = self.lock();
            match inner.state {
                ConnectionState::Quitting | ConnectionState::Quit => {
                    return Err(ClientError::retired(&self.instance));
                }
                ConnectionState::Ready => return Ok(()),
                ConnectionState::Disconnected | ConnectionState::Connecting => {}
            }

            if let Some(pending) = &inner.pending {
                pending.shared.clone()
            } else {
                let (settle, settled) = oneshot::channel();
                let instance = self.instance.clone();
                let shared: SharedConnect = async move {
                    match settled.await {
                        Ok(outcome) => outcome,
                        // Hook dropped without firing: the manager went away
                        // mid-attempt, which only disconnect() can cause.
                        Err(_) => Err(ClientError::aborted(instance)),
                    }
                }
                .boxed()
                .shared();

                inner.state = ConnectionState::Connecting;
                inner.pending = Some(PendingConnection {
                    shared: shared.clone(),
                    settle: Some(settle),
                });
                debug!(instance = %self.instance, "starting connection attempt");
                // Kick the driver while the lock is still held, so a
                // disconnect cannot slip between registering the attempt
                // and opening the underlying connection. open() never
                // blocks and never re-enters the manager.
                self.driver.open();
                shared
            }
        };

        shared.await
    }

    /// The operation every command path calls before executing.
    pub async fn ensure_ready(&self) -> Result<(), ClientError> {
        self.connect().await
    }

    /// Retires the instance.
    ///
    /// Any pending connect is rejected with
    /// [`ClientError::ConnectionAborted`]; an established connection is
    /// closed gracefully. Idempotent: calling again after retirement only
    /// logs.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        {
            let mut inner = self.lock();
            if inner.state.is_shutting_down() {
                debug!(instance = %self.instance, "disconnect called on retired client");
                return Ok(());
            }
            inner.state = ConnectionState::Quitting;
            if let Some(mut pending) = inner.pending.take() {
                if let Some(settle) = pending.settle.take() {
                    let _ = settle.send(Err(ClientError::aborted(&self.instance)));
                    debug!(instance = %self.instance, "aborted pending connection attempt");
                }
            }
        }

        let close_result = if self.driver.is_open() {
            self.driver.close().await.map_err(|err| {
                error!(instance = %self.instance, error = %err, "graceful close failed");
                ClientError::connection_failed(
                    &self.instance,
                    format!("graceful close failed: {}", err),
                )
            })
        } else {
            Ok(())
        };

        self.lock().state = ConnectionState::Quit;
        info!(instance = %self.instance, "client retired");
        close_result
    }

    /// Current state, O(1).
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Whether commands may be dispatched right now.
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Whether the instance has been permanently retired.
    pub fn is_quit(&self) -> bool {
        self.state().is_quit()
    }

    /// Probes liveness. Only pings when ready and not retired; any
    /// failure answers `false`, never an error.
    pub async fn is_healthy(&self) -> bool {
        if !self.is_ready() {
            return false;
        }
        match self.driver.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(instance = %self.instance, error = %err, "health probe failed");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("instance", &self.instance)
            .field("state", &self.state())
            .finish()
    }
}

/// Translates driver lifecycle events into state transitions, log lines,
/// and settlement of the pending connection future.
async fn watch_events(
    instance: String,
    mut events: broadcast::Receiver<DriverEvent>,
    driver: Arc<dyn StoreClient>,
    inner: Arc<Mutex<Inner>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if handle_event(&instance, event, &inner) {
                    // The driver came up after retirement; nothing else
                    // will close it.
                    if let Err(err) = driver.close().await {
                        warn!(instance = %instance, error = %err, "failed to close late connection");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(instance = %instance, skipped, "lagged behind driver events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Returns `true` when the driver must be closed because it finished
/// connecting after the instance was retired.
fn handle_event(instance: &str, event: DriverEvent, inner: &Mutex<Inner>) -> bool {
    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    match event {
        DriverEvent::Connect => {
            debug!(instance = %instance, "connection initiated");
        }
        DriverEvent::Ready => {
            if inner.state.is_shutting_down() {
                // A late ready must not resurrect a retired client.
                debug!(instance = %instance, "closing connection that became ready after shutdown");
                return true;
            }
            inner.state = ConnectionState::Ready;
            if let Some(mut pending) = inner.pending.take() {
                if let Some(settle) = pending.settle.take() {
                    let _ = settle.send(Ok(()));
                }
            }
            info!(instance = %instance, "connection ready");
        }
        DriverEvent::Error(reason) => {
            // Reject and CLEAR the pending attempt, so the next connect()
            // starts fresh instead of observing a settled failure forever.
            if let Some(mut pending) = inner.pending.take() {
                if let Some(settle) = pending.settle.take() {
                    let _ = settle.send(Err(ClientError::connection_failed(instance, &reason)));
                }
                if !inner.state.is_shutting_down() {
                    inner.state = ConnectionState::Disconnected;
                }
                error!(instance = %instance, reason = %reason, "connection attempt failed");
            } else {
                error!(instance = %instance, reason = %reason, "driver error");
            }
        }
        DriverEvent::End => {
            if inner.state.is_shutting_down() {
                debug!(instance = %instance, "connection ended during shutdown");
                return false;
            }
            if let Some(mut pending) = inner.pending.take() {
                if let Some(settle) = pending.settle.take() {
                    let _ = settle.send(Err(ClientError::connection_failed(
                        instance,
                        "connection ended before becoming ready",
                    )));
                }
            }
            inner.state = ConnectionState::Disconnected;
            warn!(instance = %instance, "connection ended");
        }
        DriverEvent::Reconnecting { attempt, delay_ms } => {
            if !inner.state.is_shutting_down() {
                inner.state = ConnectionState::Connecting;
                info!(instance = %instance, attempt, delay_ms, "reconnecting");
            }
        }
    }
    false
}
