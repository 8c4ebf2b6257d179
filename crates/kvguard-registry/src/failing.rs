//! The stand-in client for instances that never came up.

use std::fmt;

use kvguard_client::{Commands, Pipeline};
use kvguard_core::{ClientError, LogPolicyUpdate, Value};
use tracing::{debug, warn};

/// A proxy registered in place of an instance whose construction failed.
///
/// It answers the full [`Commands`] surface so callers need no special
/// case: every operation logs a warning naming the command and its
/// arguments, then fails with [`ClientError::NotInitialized`] carrying
/// the original construction failure. Identity queries still answer, and
/// retirement is a quiet no-op, so registry-wide shutdown is never
/// disturbed by an instance that never existed.
pub struct FailingClient {
    name: String,
    reason: String,
}

impl FailingClient {
    /// Creates a proxy for the named instance, capturing why it could not
    /// be constructed.
    pub fn new(name: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// The captured construction-time failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn refuse<T>(&self, command: &str, params: &dyn fmt::Display) -> Result<T, ClientError> {
        warn!(
            instance = %self.name,
            command,
            params = %params,
            reason = %self.reason,
            "command refused: instance never initialized"
        );
        Err(ClientError::not_initialized(&self.name, &self.reason))
    }
}

impl fmt::Debug for FailingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailingClient")
            .field("instance", &self.name)
            .field("reason", &self.reason)
            .finish()
    }
}

struct Joined<'a>(&'a [&'a str]);

impl fmt::Display for Joined<'_> {
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

#[async_trait::async_trait]
impl Commands for FailingClient {
    fn instance_name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        self.refuse("CONNECT", &"")
    }

    async fn quit(&self) -> Result<(), ClientError> {
        // Nothing to tear down; shutdown must not trip over us.
        debug!(instance = %self.name, "quit on never-initialized instance");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        false
    }

    fn update_log_policy(&self, _update: &LogPolicyUpdate) {
        warn!(
            instance = %self.name,
            reason = %self.reason,
            "log policy update ignored: instance never initialized"
        );
    }

    fn multi(&self) -> Result<Pipeline, ClientError> {
        self.refuse("MULTI", &"")
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.refuse("GET", &key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.refuse("SET", &Joined(&[key, value]))
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<(), ClientError> {
        self.refuse("SETEX", &Joined(&[key, value]))
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ClientError> {
        self.refuse("SETNX", &Joined(&[key, value]))
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>, ClientError> {
        self.refuse("MGET", &Joined(keys))
    }

    async fn mset(&self, _pairs: &[(&str, &str)]) -> Result<(), ClientError> {
        self.refuse("MSET", &"")
    }

    async fn incr(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("INCR", &key)
    }

    async fn decr(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("DECR", &key)
    }

    async fn incr_by(&self, key: &str, _delta: i64) -> Result<i64, ClientError> {
        self.refuse("INCRBY", &key)
    }

    async fn decr_by(&self, key: &str, _delta: i64) -> Result<i64, ClientError> {
        self.refuse("DECRBY", &key)
    }

    async fn del(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.refuse("DEL", &Joined(keys))
    }

    async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        self.refuse("EXISTS", &key)
    }

    async fn expire(&self, key: &str, _ttl_secs: u64) -> Result<bool, ClientError> {
        self.refuse("EXPIRE", &key)
    }

    async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("TTL", &key)
    }

    async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        self.refuse("PERSIST", &key)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ClientError> {
        self.refuse("KEYS", &pattern)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, ClientError> {
        self.refuse("HGET", &Joined(&[key, field]))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<i64, ClientError> {
        self.refuse("HSET", &Joined(&[key, field, value]))
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64, ClientError> {
        self.refuse("HDEL", &Joined(fields))
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ClientError> {
        self.refuse("HGETALL", &key)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, ClientError> {
        self.refuse("HEXISTS", &Joined(&[key, field]))
    }

    async fn hlen(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("HLEN", &key)
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.refuse("HKEYS", &key)
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.refuse("HVALS", &key)
    }

    async fn lpush(&self, key: &str, _values: &[&str]) -> Result<i64, ClientError> {
        self.refuse("LPUSH", &key)
    }

    async fn rpush(&self, key: &str, _values: &[&str]) -> Result<i64, ClientError> {
        self.refuse("RPUSH", &key)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.refuse("LPOP", &key)
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.refuse("RPOP", &key)
    }

    async fn llen(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("LLEN", &key)
    }

    async fn lrange(&self, key: &str, _start: i64, _stop: i64) -> Result<Vec<String>, ClientError> {
        self.refuse("LRANGE", &key)
    }

    async fn sadd(&self, key: &str, _members: &[&str]) -> Result<i64, ClientError> {
        self.refuse("SADD", &key)
    }

    async fn srem(&self, key: &str, _members: &[&str]) -> Result<i64, ClientError> {
        self.refuse("SREM", &key)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.refuse("SMEMBERS", &key)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ClientError> {
        self.refuse("SISMEMBER", &Joined(&[key, member]))
    }

    async fn scard(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("SCARD", &key)
    }

    async fn zadd(&self, key: &str, _score: f64, member: &str) -> Result<i64, ClientError> {
        self.refuse("ZADD", &Joined(&[key, member]))
    }

    async fn zrem(&self, key: &str, _members: &[&str]) -> Result<i64, ClientError> {
        self.refuse("ZREM", &key)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, ClientError> {
        self.refuse("ZSCORE", &Joined(&[key, member]))
    }

    async fn zcard(&self, key: &str) -> Result<i64, ClientError> {
        self.refuse("ZCARD", &key)
    }

    async fn zrange(&self, key: &str, _start: i64, _stop: i64) -> Result<Vec<String>, ClientError> {
        self.refuse("ZRANGE", &key)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<i64, ClientError> {
        self.refuse("PUBLISH", &Joined(&[channel, message]))
    }

    async fn eval(&self, _script: &str, keys: &[&str], _args: &[&str]) -> Result<Value, ClientError> {
        self.refuse("EVAL", &Joined(keys))
    }

    async fn ping(&self) -> Result<(), ClientError> {
        self.refuse("PING", &"")
    }
}
