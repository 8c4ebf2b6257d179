//! Raw command execution against a driver handle.
//!
//! [`CommandExecutor`] owns the translation from typed method calls into
//! wire commands and from untyped replies back into natural Rust types.
//! It performs no readiness checks and no logging; that is the
//! instrumented client's job.

use std::sync::Arc;

use kvguard_core::{ClientError, Command, DriverError, StoreClient, Value};

/// Builds commands, dispatches them, and normalizes their replies.
#[derive(Clone)]
pub struct CommandExecutor {
    instance: String,
    driver: Arc<dyn StoreClient>,
}

impl CommandExecutor {
    /// Creates an executor for the given instance name and driver handle.
    pub fn new(instance: impl Into<String>, driver: Arc<dyn StoreClient>) -> Self {
        Self {
            instance: instance.into(),
            driver,
        }
    }

    async fn dispatch(&self, command: Command) -> Result<Value, ClientError> {
        let name = command.name();
        self.driver
            .dispatch(command)
            .await
            .map_err(|err| ClientError::command_failed(&self.instance, name, err))
    }

    fn normalize<T>(&self, command: &str, result: Result<T, DriverError>) -> Result<T, ClientError> {
        result.map_err(|err| ClientError::command_failed(&self.instance, command, err))
    }

    // Strings

    pub async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let reply = self.dispatch(Command::new("GET").arg(key)).await?;
        self.normalize("GET", reply.into_text())
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.dispatch(Command::new("SET").arg(key).arg(value))
            .await
            .map(|_| ())
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ClientError> {
        self.dispatch(Command::new("SETEX").arg(key).arg(ttl_secs).arg(value))
            .await
            .map(|_| ())
    }

    pub async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ClientError> {
        let reply = self.dispatch(Command::new("SETNX").arg(key).arg(value)).await?;
        Ok(self.normalize("SETNX", reply.into_integer())? == 1)
    }

    pub async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>, ClientError> {
        let reply = self.dispatch(Command::new("MGET").args_from(keys)).await?;
        let items = self.normalize("MGET", reply.into_array())?;
        items
            .into_iter()
            .map(|item| self.normalize("MGET", item.into_text()))
            .collect()
    }

    pub async fn mset(&self, pairs: &[(&str, &str)]) -> Result<(), ClientError> {
        let mut command = Command::new("MSET");
        for (key, value) in pairs {
            command = command.arg(key).arg(value);
        }
        self.dispatch(command).await.map(|_| ())
    }

    pub async fn incr(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("INCR").arg(key)).await?;
        self.normalize("INCR", reply.into_integer())
    }

    pub async fn decr(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("DECR").arg(key)).await?;
        self.normalize("DECR", reply.into_integer())
    }

    pub async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("INCRBY").arg(key).arg(delta)).await?;
        self.normalize("INCRBY", reply.into_integer())
    }

    pub async fn decr_by(&self, key: &str, delta: i64) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("DECRBY").arg(key).arg(delta)).await?;
        self.normalize("DECRBY", reply.into_integer())
    }

    // Keyspace

    pub async fn del(&self, keys: &[&str]) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("DEL").args_from(keys)).await?;
        self.normalize("DEL", reply.into_integer())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        let reply = self.dispatch(Command::new("EXISTS").arg(key)).await?;
        Ok(self.normalize("EXISTS", reply.into_integer())? == 1)
    }

    pub async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, ClientError> {
        let reply = self.dispatch(Command::new("EXPIRE").arg(key).arg(ttl_secs)).await?;
        Ok(self.normalize("EXPIRE", reply.into_integer())? == 1)
    }

    pub async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("TTL").arg(key)).await?;
        self.normalize("TTL", reply.into_integer())
    }

    pub async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        let reply = self.dispatch(Command::new("PERSIST").arg(key)).await?;
        Ok(self.normalize("PERSIST", reply.into_integer())? == 1)
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, ClientError> {
        let reply = self.dispatch(Command::new("KEYS").arg(pattern)).await?;
        self.normalize("KEYS", reply.into_text_array())
    }

    // Hashes

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, ClientError> {
        let reply = self.dispatch(Command::new("HGET").arg(key).arg(field)).await?;
        self.normalize("HGET", reply.into_text())
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("HSET").arg(key).arg(field).arg(value))
            .await?;
        self.normalize("HSET", reply.into_integer())
    }

    pub async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("HDEL").arg(key).args_from(fields))
            .await?;
        self.normalize("HDEL", reply.into_integer())
    }

    pub async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ClientError> {
        let reply = self.dispatch(Command::new("HGETALL").arg(key)).await?;
        let pairs = self.normalize("HGETALL", reply.into_pairs())?;
        let mut out = Vec::with_capacity(pairs.len());
        for (field, value) in pairs {
            if let Some(text) = self.normalize("HGETALL", value.into_text())? {
                out.push((field, text));
            }
        }
        Ok(out)
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool, ClientError> {
        let reply = self.dispatch(Command::new("HEXISTS").arg(key).arg(field)).await?;
        Ok(self.normalize("HEXISTS", reply.into_integer())? == 1)
    }

    pub async fn hlen(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("HLEN").arg(key)).await?;
        self.normalize("HLEN", reply.into_integer())
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>, ClientError> {
        let reply = self.dispatch(Command::new("HKEYS").arg(key)).await?;
        self.normalize("HKEYS", reply.into_text_array())
    }

    pub async fn hvals(&self, key: &str) -> Result<Vec<String>, ClientError> {
        let reply = self.dispatch(Command::new("HVALS").arg(key)).await?;
        self.normalize("HVALS", reply.into_text_array())
    }

    // Lists

    pub async fn lpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("LPUSH").arg(key).args_from(values))
            .await?;
        self.normalize("LPUSH", reply.into_integer())
    }

    pub async fn rpush(&self, key: &str, values: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("RPUSH").arg(key).args_from(values))
            .await?;
        self.normalize("RPUSH", reply.into_integer())
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        let reply = self.dispatch(Command::new("LPOP").arg(key)).await?;
        self.normalize("LPOP", reply.into_text())
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<String>, ClientError> {
        let reply = self.dispatch(Command::new("RPOP").arg(key)).await?;
        self.normalize("RPOP", reply.into_text())
    }

    pub async fn llen(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("LLEN").arg(key)).await?;
        self.normalize("LLEN", reply.into_integer())
    }

    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        let reply = self
            .dispatch(Command::new("LRANGE").arg(key).arg(start).arg(stop))
            .await?;
        self.normalize("LRANGE", reply.into_text_array())
    }

    // Sets

    pub async fn sadd(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("SADD").arg(key).args_from(members))
            .await?;
        self.normalize("SADD", reply.into_integer())
    }

    pub async fn srem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("SREM").arg(key).args_from(members))
            .await?;
        self.normalize("SREM", reply.into_integer())
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, ClientError> {
        let reply = self.dispatch(Command::new("SMEMBERS").arg(key)).await?;
        self.normalize("SMEMBERS", reply.into_text_array())
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool, ClientError> {
        let reply = self
            .dispatch(Command::new("SISMEMBER").arg(key).arg(member))
            .await?;
        Ok(self.normalize("SISMEMBER", reply.into_integer())? == 1)
    }

    pub async fn scard(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("SCARD").arg(key)).await?;
        self.normalize("SCARD", reply.into_integer())
    }

    // Sorted sets

    pub async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("ZADD").arg(key).arg(score).arg(member))
            .await?;
        self.normalize("ZADD", reply.into_integer())
    }

    pub async fn zrem(&self, key: &str, members: &[&str]) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("ZREM").arg(key).args_from(members))
            .await?;
        self.normalize("ZREM", reply.into_integer())
    }

    pub async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, ClientError> {
        let reply = self.dispatch(Command::new("ZSCORE").arg(key).arg(member)).await?;
        self.normalize("ZSCORE", reply.into_double())
    }

    pub async fn zcard(&self, key: &str) -> Result<i64, ClientError> {
        let reply = self.dispatch(Command::new("ZCARD").arg(key)).await?;
        self.normalize("ZCARD", reply.into_integer())
    }

    pub async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        let reply = self
            .dispatch(Command::new("ZRANGE").arg(key).arg(start).arg(stop))
            .await?;
        self.normalize("ZRANGE", reply.into_text_array())
    }

    // Misc

    pub async fn publish(&self, channel: &str, message: &str) -> Result<i64, ClientError> {
        let reply = self
            .dispatch(Command::new("PUBLISH").arg(channel).arg(message))
            .await?;
        self.normalize("PUBLISH", reply.into_integer())
    }

    pub async fn eval(&self, script: &str, keys: &[&str], args: &[&str]) -> Result<Value, ClientError> {
        self.dispatch(
            Command::new("EVAL")
                .arg(script)
                .arg(keys.len())
                .args_from(keys)
                .args_from(args),
        )
        .await
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.dispatch(Command::new("PING")).await.map(|_| ())
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("instance", &self.instance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvguard_memory::MemoryDriver;

    async fn ready_executor() -> CommandExecutor {
        let driver = Arc::new(MemoryDriver::new());
        let mut events = driver.events();
        driver.open();
        while events.recv().await.unwrap() != kvguard_core::DriverEvent::Ready {}
        CommandExecutor::new("cache", driver as Arc<dyn StoreClient>)
    }

    #[tokio::test]
    async fn get_maps_missing_keys_to_none() {
        let executor = ready_executor().await;
        assert_eq!(executor.get("missing").await.unwrap(), None);

        executor.set("k", "v").await.unwrap();
        assert_eq!(executor.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn mget_preserves_gaps() {
        let executor = ready_executor().await;
        executor.set("a", "1").await.unwrap();
        executor.set("c", "3").await.unwrap();

        let values = executor.mget(&["a", "b", "c"]).await.unwrap();
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[tokio::test]
    async fn counters_and_flags() {
        let executor = ready_executor().await;
        assert_eq!(executor.incr("n").await.unwrap(), 1);
        assert_eq!(executor.incr_by("n", 5).await.unwrap(), 6);
        assert!(executor.set_nx("n", "other").await.is_ok());
        assert!(!executor.set_nx("n", "other").await.unwrap());
        assert!(executor.exists("n").await.unwrap());
        assert_eq!(executor.del(&["n"]).await.unwrap(), 1);
        assert!(!executor.exists("n").await.unwrap());
    }

    #[tokio::test]
    async fn hash_round_trip() {
        let executor = ready_executor().await;
        executor.hset("h", "f1", "v1").await.unwrap();
        executor.hset("h", "f2", "v2").await.unwrap();

        assert_eq!(executor.hget("h", "f1").await.unwrap(), Some("v1".into()));
        assert_eq!(executor.hlen("h").await.unwrap(), 2);
        let mut all = executor.hgetall("h").await.unwrap();
        all.sort();
        assert_eq!(
            all,
            vec![("f1".into(), "v1".into()), ("f2".into(), "v2".into())]
        );
    }

    #[tokio::test]
    async fn command_failures_name_instance_and_command() {
        let driver = Arc::new(MemoryDriver::new());
        // Not opened: every dispatch is refused.
        let executor = CommandExecutor::new("cache", driver as Arc<dyn StoreClient>);

        let err = executor.get("k").await.unwrap_err();
        assert_eq!(err.instance(), "cache");
        assert!(err.to_string().contains("GET"));
    }
}
