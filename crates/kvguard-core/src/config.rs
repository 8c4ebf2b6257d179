//! Per-instance configuration.
//!
//! These types describe an already-validated configuration; parsing and
//! sanitizing raw configuration files happens outside this crate. All of
//! them derive `serde` so an embedding application can deserialize them
//! from whatever format it loads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One network address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addr {
    /// Host name or IP.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Addr {
    /// Creates an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The connection arrangement of the underlying resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ConnectionMode {
    /// One standalone node.
    Single {
        /// The node to connect to.
        addr: Addr,
    },

    /// A sentinel-monitored primary.
    Sentinel {
        /// The monitored service name.
        service: String,
        /// The sentinel nodes to query.
        sentinels: Vec<Addr>,
    },

    /// A clustered deployment. Cluster drivers manage their own
    /// reconnection, so the backoff policy is not applied in this mode.
    Cluster {
        /// Seed nodes.
        nodes: Vec<Addr>,
    },
}

impl ConnectionMode {
    /// Whether the lifecycle-level reconnect policy applies to this mode.
    pub fn supports_reconnect_policy(&self) -> bool {
        !matches!(self, ConnectionMode::Cluster { .. })
    }
}

/// A log level, decoupled from any particular logging backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Developer diagnostics.
    Debug,
    /// Operational messages.
    Info,
    /// Something suspicious but recoverable.
    Warn,
    /// A failure.
    Error,
}

impl LogLevel {
    /// The corresponding `tracing` level.
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// How one instance logs its commands.
///
/// This is the only part of an [`InstanceConfig`] that may change after
/// construction; see [`LogPolicyUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandLogPolicy {
    /// Level for successful commands.
    pub success_level: LogLevel,
    /// Level for failed commands.
    pub error_level: LogLevel,
    /// Whether to include command parameters in log entries.
    pub log_params: bool,
    /// Whether to include return values in log entries.
    pub log_returns: bool,
}

impl Default for CommandLogPolicy {
    fn default() -> Self {
        Self {
            success_level: LogLevel::Debug,
            error_level: LogLevel::Error,
            log_params: false,
            log_returns: false,
        }
    }
}

impl CommandLogPolicy {
    /// Applies the set fields of an update, leaving the rest untouched.
    pub fn apply(&mut self, update: &LogPolicyUpdate) {
        if let Some(level) = update.success_level {
            self.success_level = level;
        }
        if let Some(level) = update.error_level {
            self.error_level = level;
        }
        if let Some(flag) = update.log_params {
            self.log_params = flag;
        }
        if let Some(flag) = update.log_returns {
            self.log_returns = flag;
        }
    }
}

/// A partial update to a [`CommandLogPolicy`].
///
/// Only logging behavior is reconfigurable at runtime; connection-affecting
/// fields are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPolicyUpdate {
    /// New success level, if set.
    pub success_level: Option<LogLevel>,
    /// New error level, if set.
    pub error_level: Option<LogLevel>,
    /// New parameter-logging flag, if set.
    pub log_params: Option<bool>,
    /// New return-value-logging flag, if set.
    pub log_returns: Option<bool>,
}

/// Backoff settings for topologies with lifecycle-level reconnection.
///
/// The delay before retry `n` is `min(n * backoff_step_ms, backoff_cap_ms)`;
/// once `n` exceeds `max_retries` the connection attempt fails terminally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries before giving up.
    pub max_retries: u32,
    /// Linear backoff step, in milliseconds.
    pub backoff_step_ms: u64,
    /// Backoff cap, in milliseconds.
    pub backoff_cap_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_step_ms: 50,
            backoff_cap_ms: 2000,
        }
    }
}

/// Configuration for one logical instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Logical name, unique within a registry.
    pub name: String,

    /// Topology and addressing.
    #[serde(flatten)]
    pub mode: ConnectionMode,

    /// Command logging policy.
    #[serde(default)]
    pub log_policy: CommandLogPolicy,

    /// Reconnect backoff settings.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl InstanceConfig {
    /// Convenience constructor for a single-node instance.
    pub fn single(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            mode: ConnectionMode::Single {
                addr: Addr::new(host, port),
            },
            log_policy: CommandLogPolicy::default(),
            retry: RetrySettings::default(),
        }
    }

    /// Replaces the log policy.
    pub fn with_log_policy(mut self, policy: CommandLogPolicy) -> Self {
        self.log_policy = policy;
        self
    }

    /// Replaces the retry settings.
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for a whole registry: declared instances plus an optional
/// explicit default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The instance to return when callers ask for no particular name.
    #[serde(default)]
    pub default_instance: Option<String>,

    /// Declared instances, in order.
    pub instances: Vec<InstanceConfig>,
}

impl RegistryConfig {
    /// A registry with the given instances and no explicit default.
    pub fn new(instances: Vec<InstanceConfig>) -> Self {
        Self {
            default_instance: None,
            instances,
        }
    }

    /// Sets the explicit default instance.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_instance = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_policy_defaults() {
        let policy = CommandLogPolicy::default();
        assert_eq!(policy.success_level, LogLevel::Debug);
        assert_eq!(policy.error_level, LogLevel::Error);
        assert!(!policy.log_params);
        assert!(!policy.log_returns);
    }

    #[test]
    fn update_touches_only_set_fields() {
        let mut policy = CommandLogPolicy::default();
        policy.apply(&LogPolicyUpdate {
            success_level: Some(LogLevel::Info),
            ..Default::default()
        });
        assert_eq!(policy.success_level, LogLevel::Info);
        assert_eq!(policy.error_level, LogLevel::Error);
    }

    #[test]
    fn retry_defaults_match_the_documented_policy() {
        let retry = RetrySettings::default();
        assert_eq!(retry.max_retries, 10);
        assert_eq!(retry.backoff_step_ms, 50);
        assert_eq!(retry.backoff_cap_ms, 2000);
    }

    #[test]
    fn cluster_mode_opts_out_of_the_policy() {
        let cluster = ConnectionMode::Cluster { nodes: vec![] };
        assert!(!cluster.supports_reconnect_policy());

        let single = ConnectionMode::Single {
            addr: Addr::new("localhost", 6379),
        };
        assert!(single.supports_reconnect_policy());
    }

    #[test]
    fn instance_config_deserializes_with_defaults() {
        let config: InstanceConfig = serde_json::from_str(
            r#"{
                "name": "cache",
                "mode": "single",
                "addr": { "host": "localhost", "port": 6379 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.name, "cache");
        assert_eq!(config.log_policy, CommandLogPolicy::default());
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn sentinel_mode_deserializes() {
        let config: InstanceConfig = serde_json::from_str(
            r#"{
                "name": "sessions",
                "mode": "sentinel",
                "service": "mymaster",
                "sentinels": [{ "host": "s1", "port": 26379 }]
            }"#,
        )
        .unwrap();
        match config.mode {
            ConnectionMode::Sentinel { service, sentinels } => {
                assert_eq!(service, "mymaster");
                assert_eq!(sentinels.len(), 1);
            }
            other => panic!("expected sentinel mode, got {:?}", other),
        }
    }
}
