//! Task-local correlation context.
//!
//! An ambient, scope-bound key/value store that threads identifiers
//! (correlation id, transaction id) through nested and concurrent
//! asynchronous executions, so every log line and outbound call of one
//! unit of work can be correlated.
//!
//! A scope is entered with [`run`] (or [`run_sync`] for synchronous
//! bodies). The new scope starts from a snapshot of the caller's values;
//! mutations inside it are invisible to the caller once it exits:
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use kvguard_context as context;
//!
//! context::run(async {
//!     context::set("tenant", "acme");
//!     let outer_id = context::correlation_id();
//!
//!     context::run(async {
//!         // Inherited for reading, isolated for writing.
//!         assert_eq!(context::get("tenant").as_deref(), Some("acme"));
//!         assert_eq!(context::correlation_id(), outer_id);
//!         context::set("tenant", "other");
//!     })
//!     .await;
//!
//!     assert_eq!(context::get("tenant").as_deref(), Some("acme"));
//! })
//! .await;
//! # }
//! ```
//!
//! Scope storage is task-local: concurrent tasks each own an independent
//! map, so no locking is involved anywhere.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Once;

/// Key under which the correlation id is stored.
pub const CORRELATION_ID_KEY: &str = "correlationId";

/// Key under which the transaction id is stored.
pub const TRANSACTION_ID_KEY: &str = "transactionId";

tokio::task_local! {
    static SCOPE: RefCell<HashMap<String, String>>;
}

static UNSCOPED_SET_WARNING: Once = Once::new();

fn snapshot() -> HashMap<String, String> {
    SCOPE
        .try_with(|scope| scope.borrow().clone())
        .unwrap_or_default()
}

fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Runs `fut` inside a new context scope.
///
/// The scope starts as a snapshot of the caller's current values. On exit
/// (normal or via panic/cancellation) the caller's scope is exactly what
/// it was before; nothing written inside leaks upward.
pub async fn run<F>(fut: F) -> F::Output
where
    F: Future,
{
    SCOPE.scope(RefCell::new(snapshot()), fut).await
}

/// Synchronous variant of [`run`].
pub fn run_sync<T>(f: impl FnOnce() -> T) -> T {
    SCOPE.sync_scope(RefCell::new(snapshot()), f)
}

/// Stores a value in the current scope.
///
/// Outside any scope there is nowhere to store the value; the call is
/// dropped and a warning is logged once per process.
pub fn set(key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    let stored = SCOPE
        .try_with(|scope| {
            scope.borrow_mut().insert(key, value);
        })
        .is_ok();
    if !stored {
        UNSCOPED_SET_WARNING.call_once(|| {
            tracing::warn!(
                "context::set called outside a context scope; value dropped. \
                 Wrap the unit of work in context::run"
            );
        });
    }
}

/// Reads a value from the current scope.
pub fn get(key: &str) -> Option<String> {
    SCOPE
        .try_with(|scope| scope.borrow().get(key).cloned())
        .ok()
        .flatten()
}

/// A copy of every value in the current scope.
pub fn all() -> HashMap<String, String> {
    snapshot()
}

/// The current scope's correlation id.
///
/// Generated and stored on first access, so it is never absent and stays
/// stable for the rest of the scope. Outside any scope a fresh id is
/// returned on every call, since there is no scope to pin it to.
pub fn correlation_id() -> String {
    SCOPE
        .try_with(|scope| {
            scope
                .borrow_mut()
                .entry(CORRELATION_ID_KEY.to_string())
                .or_insert_with(fresh_id)
                .clone()
        })
        .unwrap_or_else(|_| fresh_id())
}

/// The current scope's transaction id, if one was set.
pub fn transaction_id() -> Option<String> {
    get(TRANSACTION_ID_KEY)
}

/// Sets the transaction id grouping this scope into a larger unit of work.
pub fn set_transaction_id(id: impl Into<String>) {
    set(TRANSACTION_ID_KEY, id);
}

/// Header names used when projecting the context onto outbound requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeaderNames {
    /// Header carrying the correlation id.
    pub correlation_id: String,
    /// Header carrying the transaction id.
    pub transaction_id: String,
}

impl Default for TraceHeaderNames {
    fn default() -> Self {
        Self {
            correlation_id: "x-correlation-id".to_string(),
            transaction_id: "x-transaction-id".to_string(),
        }
    }
}

/// Projects the current correlation/transaction ids into a header map for
/// outbound propagation to downstream services.
///
/// The correlation id is always present (generated if needed); the
/// transaction id only when one was set.
pub fn trace_headers(names: &TraceHeaderNames) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(names.correlation_id.clone(), correlation_id());
    if let Some(txn) = transaction_id() {
        headers.insert(names.transaction_id.clone(), txn);
    }
    headers
}
