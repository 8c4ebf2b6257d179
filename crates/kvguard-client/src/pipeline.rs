//! Command pipelines: queue locally, flush in one readiness window.

use std::sync::Arc;
use std::time::Instant;

use kvguard_connection::ConnectionManager;
use kvguard_core::{ClientError, Command, CommandLogPolicy, StoreClient, Value};

use crate::log::dyn_event;

/// A queue of commands flushed together.
///
/// Queueing is purely local; nothing touches the connection until
/// [`exec`](Pipeline::exec). Execution checks readiness once, then
/// dispatches the queued commands in order, stopping at the first
/// failure. The whole flush produces a single instrumentation entry
/// rather than one per command.
pub struct Pipeline {
    instance: String,
    manager: Arc<ConnectionManager>,
    driver: Arc<dyn StoreClient>,
    policy: CommandLogPolicy,
    queued: Vec<Command>,
}

impl Pipeline {
    pub(crate) fn new(
        instance: impl Into<String>,
        manager: Arc<ConnectionManager>,
        policy: CommandLogPolicy,
    ) -> Self {
        let driver = manager.client_handle();
        Self {
            instance: instance.into(),
            manager,
            driver,
            policy,
            queued: Vec::new(),
        }
    }

    /// Queues an arbitrary command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.queued.push(command);
        self
    }

    /// Queues a `GET`.
    pub fn get(&mut self, key: &str) -> &mut Self {
        self.push(Command::new("GET").arg(key))
    }

    /// Queues a `SET`.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.push(Command::new("SET").arg(key).arg(value))
    }

    /// Queues a `SETEX`.
    pub fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> &mut Self {
        self.push(Command::new("SETEX").arg(key).arg(ttl_secs).arg(value))
    }

    /// Queues a `DEL`.
    pub fn del(&mut self, keys: &[&str]) -> &mut Self {
        self.push(Command::new("DEL").args_from(keys))
    }

    /// Queues an `INCR`.
    pub fn incr(&mut self, key: &str) -> &mut Self {
        self.push(Command::new("INCR").arg(key))
    }

    /// Queues an `HSET`.
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> &mut Self {
        self.push(Command::new("HSET").arg(key).arg(field).arg(value))
    }

    /// Queues an `EXPIRE`.
    pub fn expire(&mut self, key: &str, ttl_secs: u64) -> &mut Self {
        self.push(Command::new("EXPIRE").arg(key).arg(ttl_secs))
    }

    /// Number of commands queued so far.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Flushes the queue, returning one raw reply per queued command.
    ///
    /// The first failing command aborts the flush; its error carries the
    /// command word that failed, not a generic pipeline error.
    pub async fn exec(self) -> Result<Vec<Value>, ClientError> {
        let count = self.queued.len();
        let started = Instant::now();
        let correlation_id = kvguard_context::correlation_id();

        if let Err(err) = self.manager.ensure_ready().await {
            dyn_event!(
                self.policy.error_level.as_tracing(),
                command = "EXEC",
                instance = %self.instance,
                correlation_id = %correlation_id,
                error = %err,
                "pipeline refused: instance not ready"
            );
            return Err(err);
        }

        let mut replies = Vec::with_capacity(count);
        for command in self.queued {
            let name = command.name();
            match self.driver.dispatch(command).await {
                Ok(reply) => replies.push(reply),
                Err(err) => {
                    let err = ClientError::command_failed(&self.instance, name, err);
                    dyn_event!(
                        self.policy.error_level.as_tracing(),
                        command = "EXEC",
                        instance = %self.instance,
                        correlation_id = %correlation_id,
                        duration_ms = started.elapsed().as_millis() as u64,
                        failed_command = name,
                        error = %err,
                        "pipeline aborted"
                    );
                    return Err(err);
                }
            }
        }

        dyn_event!(
            self.policy.success_level.as_tracing(),
            command = "EXEC",
            instance = %self.instance,
            correlation_id = %correlation_id,
            duration_ms = started.elapsed().as_millis() as u64,
            commands = count,
            "pipeline flushed"
        );
        Ok(replies)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("instance", &self.instance)
            .field("queued", &self.queued.len())
            .finish()
    }
}
