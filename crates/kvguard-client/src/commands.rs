//! The object-safe command surface.

use kvguard_core::{ClientError, LogPolicyUpdate, Value};

use crate::pipeline::Pipeline;

/// Everything a caller can do with an instance, behind one trait object.
///
/// Both the real [`InstrumentedClient`](crate::InstrumentedClient) and any
/// stand-in (such as a registry's failing proxy) implement this, so code
/// holding an `Arc<dyn Commands>` never needs to know whether the instance
/// behind it came up.
#[async_trait::async_trait]
pub trait Commands: Send + Sync {
    /// The logical instance name this handle serves.
    fn instance_name(&self) -> &str;

    /// Establishes the connection, or joins the attempt in flight.
    async fn connect(&self) -> Result<(), ClientError>;

    /// Permanently retires the instance.
    async fn quit(&self) -> Result<(), ClientError>;

    /// Probes liveness; never errors.
    async fn is_healthy(&self) -> bool;

    /// Applies a partial logging-policy update. Only logging behavior is
    /// reconfigurable at runtime.
    fn update_log_policy(&self, update: &LogPolicyUpdate);

    /// Starts a pipeline. Fails synchronously when the instance cannot
    /// accept commands at all (retired, or never initialized).
    fn multi(&self) -> Result<Pipeline, ClientError>;

    // Strings

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ClientError>;
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ClientError>;
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>, ClientError>;
    async fn mset(&self, pairs: &[(&str, &str)]) -> Result<(), ClientError>;
    async fn incr(&self, key: &str) -> Result<i64, ClientError>;
    async fn decr(&self, key: &str) -> Result<i64, ClientError>;
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError>;
    async fn decr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError>;

    // Keyspace

    async fn del(&self, keys: &[&str]) -> Result<i64, ClientError>;
    async fn exists(&self, key: &str) -> Result<bool, ClientError>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, ClientError>;
    async fn ttl(&self, key: &str) -> Result<i64, ClientError>;
    async fn persist(&self, key: &str) -> Result<bool, ClientError>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ClientError>;

    // Hashes

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, ClientError>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<i64, ClientError>;
    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64, ClientError>;
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ClientError>;
    async fn hexists(&self, key: &str, field: &str) -> Result<bool, ClientError>;
    async fn hlen(&self, key: &str) -> Result<i64, ClientError>;
    async fn hkeys(&self, key: &str) -> Result<Vec<String>, ClientError>;
    async fn hvals(&self, key: &str) -> Result<Vec<String>, ClientError>;

    // Lists

    async fn lpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError>;
    async fn rpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError>;
    async fn lpop(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn rpop(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn llen(&self, key: &str) -> Result<i64, ClientError>;
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError>;

    // Sets

    async fn sadd(&self, key: &str, members: &[&str]) -> Result<i64, ClientError>;
    async fn srem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, ClientError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ClientError>;
    async fn scard(&self, key: &str) -> Result<i64, ClientError>;

    // Sorted sets

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<i64, ClientError>;
    async fn zrem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError>;
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, ClientError>;
    async fn zcard(&self, key: &str) -> Result<i64, ClientError>;
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError>;

    // Misc

    async fn publish(&self, channel: &str, message: &str) -> Result<i64, ClientError>;
    async fn eval(&self, script: &str, keys: &[&str], args: &[&str]) -> Result<Value, ClientError>;
    async fn ping(&self) -> Result<(), ClientError>;
}
