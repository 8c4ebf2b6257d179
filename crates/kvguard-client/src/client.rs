//! The instrumented client: every command funnels through one execution
//! path that checks readiness, measures, and logs.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use kvguard_connection::ConnectionManager;
use kvguard_core::{
    ClientError, CommandLogPolicy, InstanceConfig, LogPolicyUpdate, StoreClient, Value,
};
use tracing::info;

use crate::commands::Commands;
use crate::executor::CommandExecutor;
use crate::log::dyn_event;
use crate::pipeline::Pipeline;

/// Renders a slice of arguments space-separated, without allocating until
/// a log entry actually wants them.
struct Args<'a>(&'a [&'a str]);

impl fmt::Display for Args<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(arg)?;
        }
        Ok(())
    }
}

/// Like [`Args`], but for parameter lists mixing strings and numbers.
struct Params<'a>(&'a [&'a (dyn fmt::Display + Sync)]);

impl fmt::Display for Params<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

struct Pairs<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for Pairs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", key, value)?;
        }
        Ok(())
    }
}

/// A client for one logical instance.
///
/// Wraps a [`ConnectionManager`] and a [`CommandExecutor`] so that every
/// command runs the same way: confirm readiness, execute, then emit one
/// structured log entry carrying the command word, instance name,
/// duration, and the ambient correlation id. Errors pass through
/// unchanged; instrumentation observes, it never rewrites outcomes.
///
/// The logging policy is the only runtime-mutable part, via
/// [`update_log_policy`](Commands::update_log_policy).
pub struct InstrumentedClient {
    name: String,
    manager: Arc<ConnectionManager>,
    executor: CommandExecutor,
    policy: RwLock<CommandLogPolicy>,
}

impl InstrumentedClient {
    /// Creates a client for the given configuration and driver.
    ///
    /// Spawns the lifecycle watcher, so a Tokio runtime must be current.
    /// Nothing is connected until [`connect`](Commands::connect) or the
    /// first command.
    pub fn new(config: &InstanceConfig, driver: Arc<dyn StoreClient>) -> Self {
        let manager = Arc::new(ConnectionManager::new(config.name.clone(), driver));
        let executor = CommandExecutor::new(config.name.clone(), manager.client_handle());
        Self {
            name: config.name.clone(),
            manager,
            executor,
            policy: RwLock::new(config.log_policy),
        }
    }

    /// The lifecycle manager, for callers that need state introspection.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// The current logging policy.
    pub fn log_policy(&self) -> CommandLogPolicy {
        *self
            .policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(feature = "metrics")]
    fn record(&self, command: &'static str, outcome: &'static str, started: Instant) {
        metrics::counter!(
            "kvguard_commands_total",
            "instance" => self.name.clone(),
            "command" => command,
            "outcome" => outcome,
        )
        .increment(1);
        metrics::histogram!(
            "kvguard_command_duration_seconds",
            "instance" => self.name.clone(),
            "command" => command,
        )
        .record(started.elapsed().as_secs_f64());
    }

    #[cfg(not(feature = "metrics"))]
    fn record(&self, _command: &'static str, _outcome: &'static str, _started: Instant) {}

    /// The single execution funnel.
    ///
    /// Readiness failures and command failures are logged at the policy's
    /// error level and re-raised as-is.
    async fn execute<T, F>(
        &self,
        command: &'static str,
        params: &(dyn fmt::Display + Sync),
        op: F,
    ) -> Result<T, ClientError>
    where
        T: fmt::Debug,
        F: std::future::Future<Output = Result<T, ClientError>>,
    {
        let policy = self.log_policy();
        let started = Instant::now();
        let correlation_id = kvguard_context::correlation_id();

        if let Err(err) = self.manager.ensure_ready().await {
            dyn_event!(
                policy.error_level.as_tracing(),
                command,
                instance = %self.name,
                correlation_id = %correlation_id,
                error = %err,
                "command refused: instance not ready"
            );
            self.record(command, "refused", started);
            return Err(err);
        }

        let result = op.await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(value) => {
                if policy.log_params && policy.log_returns {
                    dyn_event!(
                        policy.success_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        params = %params,
                        returns = ?value,
                        "command completed"
                    );
                } else if policy.log_params {
                    dyn_event!(
                        policy.success_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        params = %params,
                        "command completed"
                    );
                } else if policy.log_returns {
                    dyn_event!(
                        policy.success_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        returns = ?value,
                        "command completed"
                    );
                } else {
                    dyn_event!(
                        policy.success_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        "command completed"
                    );
                }
                self.record(command, "ok", started);
            }
            Err(err) => {
                if policy.log_params {
                    dyn_event!(
                        policy.error_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        params = %params,
                        error = %err,
                        "command failed"
                    );
                } else {
                    dyn_event!(
                        policy.error_level.as_tracing(),
                        command,
                        instance = %self.name,
                        correlation_id = %correlation_id,
                        duration_ms,
                        error = %err,
                        "command failed"
                    );
                }
                self.record(command, "error", started);
            }
        }
        result
    }
}

impl fmt::Debug for InstrumentedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedClient")
            .field("instance", &self.name)
            .field("state", &self.manager.state())
            .finish()
    }
}

#[async_trait::async_trait]
impl Commands for InstrumentedClient {
    fn instance_name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        self.manager.connect().await
    }

    async fn quit(&self) -> Result<(), ClientError> {
        self.manager.disconnect().await
    }

    async fn is_healthy(&self) -> bool {
        self.manager.is_healthy().await
    }

    fn update_log_policy(&self, update: &LogPolicyUpdate) {
        let mut policy = self
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        policy.apply(update);
        info!(instance = %self.name, policy = ?*policy, "log policy updated");
    }

    fn multi(&self) -> Result<Pipeline, ClientError> {
        if self.manager.is_quit() {
            return Err(ClientError::retired(&self.name));
        }
        Ok(Pipeline::new(
            self.name.clone(),
            Arc::clone(&self.manager),
            self.log_policy(),
        ))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.execute("GET", &key, self.executor.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.execute("SET", &Args(&[key, value]), self.executor.set(key, value))
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ClientError> {
        self.execute(
            "SETEX",
            &Params(&[&key, &ttl_secs, &value]),
            self.executor.set_ex(key, value, ttl_secs),
        )
        .await
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ClientError> {
        self.execute(
            "SETNX",
            &Args(&[key, value]),
            self.executor.set_nx(key, value),
        )
        .await
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>, ClientError> {
        self.execute("MGET", &Args(keys), self.executor.mget(keys))
            .await
    }

    async fn mset(&self, pairs: &[(&str, &str)]) -> Result<(), ClientError> {
        self.execute("MSET", &Pairs(pairs), self.executor.mset(pairs))
            .await
    }

    async fn incr(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("INCR", &key, self.executor.incr(key)).await
    }

    async fn decr(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("DECR", &key, self.executor.decr(key)).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError> {
        self.execute(
            "INCRBY",
            &Params(&[&key, &delta]),
            self.executor.incr_by(key, delta),
        )
        .await
    }

    async fn decr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError> {
        self.execute(
            "DECRBY",
            &Params(&[&key, &delta]),
            self.executor.decr_by(key, delta),
        )
        .await
    }

    async fn del(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.execute("DEL", &Args(keys), self.executor.del(keys))
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        self.execute("EXISTS", &key, self.executor.exists(key)).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, ClientError> {
        self.execute(
            "EXPIRE",
            &Params(&[&key, &ttl_secs]),
            self.executor.expire(key, ttl_secs),
        )
        .await
    }

    async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("TTL", &key, self.executor.ttl(key)).await
    }

    async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        self.execute("PERSIST", &key, self.executor.persist(key))
            .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ClientError> {
        self.execute("KEYS", &pattern, self.executor.keys(pattern))
            .await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, ClientError> {
        self.execute(
            "HGET",
            &Args(&[key, field]),
            self.executor.hget(key, field),
        )
        .await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<i64, ClientError> {
        self.execute(
            "HSET",
            &Args(&[key, field, value]),
            self.executor.hset(key, field, value),
        )
        .await
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "HDEL",
            &Params(&[&key, &Args(fields)]),
            self.executor.hdel(key, fields),
        )
        .await
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ClientError> {
        self.execute("HGETALL", &key, self.executor.hgetall(key))
            .await
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, ClientError> {
        self.execute(
            "HEXISTS",
            &Args(&[key, field]),
            self.executor.hexists(key, field),
        )
        .await
    }

    async fn hlen(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("HLEN", &key, self.executor.hlen(key)).await
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.execute("HKEYS", &key, self.executor.hkeys(key)).await
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.execute("HVALS", &key, self.executor.hvals(key)).await
    }

    async fn lpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "LPUSH",
            &Params(&[&key, &Args(values)]),
            self.executor.lpush(key, values),
        )
        .await
    }

    async fn rpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "RPUSH",
            &Params(&[&key, &Args(values)]),
            self.executor.rpush(key, values),
        )
        .await
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.execute("LPOP", &key, self.executor.lpop(key)).await
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.execute("RPOP", &key, self.executor.rpop(key)).await
    }

    async fn llen(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("LLEN", &key, self.executor.llen(key)).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        self.execute(
            "LRANGE",
            &Params(&[&key, &start, &stop]),
            self.executor.lrange(key, start, stop),
        )
        .await
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "SADD",
            &Params(&[&key, &Args(members)]),
            self.executor.sadd(key, members),
        )
        .await
    }

    async fn srem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "SREM",
            &Params(&[&key, &Args(members)]),
            self.executor.srem(key, members),
        )
        .await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.execute("SMEMBERS", &key, self.executor.smembers(key))
            .await
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ClientError> {
        self.execute(
            "SISMEMBER",
            &Args(&[key, member]),
            self.executor.sismember(key, member),
        )
        .await
    }

    async fn scard(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("SCARD", &key, self.executor.scard(key)).await
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<i64, ClientError> {
        self.execute(
            "ZADD",
            &Params(&[&key, &score, &member]),
            self.executor.zadd(key, score, member),
        )
        .await
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        self.execute(
            "ZREM",
            &Params(&[&key, &Args(members)]),
            self.executor.zrem(key, members),
        )
        .await
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, ClientError> {
        self.execute(
            "ZSCORE",
            &Args(&[key, member]),
            self.executor.zscore(key, member),
        )
        .await
    }

    async fn zcard(&self, key: &str) -> Result<i64, ClientError> {
        self.execute("ZCARD", &key, self.executor.zcard(key)).await
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        self.execute(
            "ZRANGE",
            &Params(&[&key, &start, &stop]),
            self.executor.zrange(key, start, stop),
        )
        .await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<i64, ClientError> {
        self.execute(
            "PUBLISH",
            &Args(&[channel, message]),
            self.executor.publish(channel, message),
        )
        .await
    }

    async fn eval(&self, script: &str, keys: &[&str], args: &[&str]) -> Result<Value, ClientError> {
        self.execute(
            "EVAL",
            &Params(&[&Args(keys), &Args(args)]),
            self.executor.eval(script, keys, args),
        )
        .await
    }

    async fn ping(&self) -> Result<(), ClientError> {
        self.execute("PING", &"", self.executor.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvguard_memory::MemoryDriver;

    fn client_with(driver: MemoryDriver) -> InstrumentedClient {
        let config = InstanceConfig::single("cache", "localhost", 6379);
        InstrumentedClient::new(&config, Arc::new(driver))
    }

    #[tokio::test]
    async fn first_command_connects_implicitly() {
        let client = client_with(MemoryDriver::new());
        client.set("k", "v").await.unwrap();
        assert_eq!(client.get("k").await.unwrap(), Some("v".to_string()));
        assert!(client.manager().is_ready());
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        let client = client_with(MemoryDriver::builder().fail_command("GET").build());
        client.connect().await.unwrap();

        let err = client.get("k").await.unwrap_err();
        match err {
            ClientError::CommandFailed {
                instance, command, ..
            } => {
                assert_eq!(instance, "cache");
                assert_eq!(command, "GET");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn retired_client_refuses_commands() {
        let client = client_with(MemoryDriver::new());
        client.connect().await.unwrap();
        client.quit().await.unwrap();

        let err = client.get("k").await.unwrap_err();
        assert!(err.is_retired());

        let err = client.multi().unwrap_err();
        assert!(err.is_retired());
    }

    #[tokio::test]
    async fn pipeline_flushes_in_order() {
        let client = client_with(MemoryDriver::new());

        let mut pipe = client.multi().unwrap();
        pipe.set("a", "1").incr("n").incr("n").get("a");
        let replies = pipe.exec().await.unwrap();

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[1], Value::Integer(1));
        assert_eq!(replies[2], Value::Integer(2));
        assert_eq!(replies[3], Value::Text("1".to_string()));
    }

    #[tokio::test]
    async fn pipeline_aborts_on_first_failure() {
        let client = client_with(MemoryDriver::builder().fail_command("INCR").build());

        let mut pipe = client.multi().unwrap();
        pipe.set("a", "1").incr("n").set("b", "2");
        let err = pipe.exec().await.unwrap_err();

        match err {
            ClientError::CommandFailed { command, .. } => assert_eq!(command, "INCR"),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
        // Commands before the failure did run.
        assert_eq!(client.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(client.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn log_policy_updates_apply_partially() {
        let client = client_with(MemoryDriver::new());
        assert!(!client.log_policy().log_params);

        client.update_log_policy(&LogPolicyUpdate {
            log_params: Some(true),
            ..Default::default()
        });
        let policy = client.log_policy();
        assert!(policy.log_params);
        assert_eq!(policy.error_level, CommandLogPolicy::default().error_level);
    }

    #[tokio::test]
    async fn works_behind_a_trait_object() {
        let client: Arc<dyn Commands> = Arc::new(client_with(MemoryDriver::new()));
        client.set("k", "v").await.unwrap();
        assert_eq!(client.instance_name(), "cache");
        assert!(client.is_healthy().await);
    }
}
