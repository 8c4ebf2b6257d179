//! Reconnect backoff policy.

use kvguard_core::{ConnectionMode, RetrySettings};
use std::time::Duration;

/// Backoff policy for lifecycle-level reconnection.
///
/// The policy is a function from the retry counter to either a delay or
/// a terminal failure. Topologies whose driver manages reconnection
/// internally (clusters) use [`ReconnectPolicy::None`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// No lifecycle-level reconnection.
    None,

    /// Linear backoff: `min(attempt * step, cap)`, terminal once
    /// `attempt` exceeds `max_retries`.
    Linear {
        /// Per-attempt delay increment.
        step: Duration,
        /// Upper bound on the delay.
        cap: Duration,
        /// Retries before giving up.
        max_retries: u32,
    },
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn none() -> Self {
        ReconnectPolicy::None
    }

    /// A linear backoff policy.
    pub fn linear(step: Duration, cap: Duration, max_retries: u32) -> Self {
        ReconnectPolicy::Linear {
            step,
            cap,
            max_retries,
        }
    }

    /// Builds the policy from configured retry settings.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        ReconnectPolicy::Linear {
            step: Duration::from_millis(settings.backoff_step_ms),
            cap: Duration::from_millis(settings.backoff_cap_ms),
            max_retries: settings.max_retries,
        }
    }

    /// Builds the policy appropriate for a connection mode: cluster
    /// drivers reconnect on their own, everything else follows the
    /// configured settings.
    pub fn for_mode(mode: &ConnectionMode, settings: &RetrySettings) -> Self {
        if mode.supports_reconnect_policy() {
            Self::from_settings(settings)
        } else {
            Self::None
        }
    }

    /// The delay before retry `attempt` (1-based), or `None` once the
    /// attempt budget is exhausted (terminal failure).
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            ReconnectPolicy::None => None,
            ReconnectPolicy::Linear {
                step,
                cap,
                max_retries,
            } => {
                if attempt > *max_retries {
                    None
                } else {
                    Some((*step * attempt).min(*cap))
                }
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvguard_core::Addr;

    #[test]
    fn none_is_always_terminal() {
        let policy = ReconnectPolicy::none();
        assert_eq!(policy.delay_for_attempt(1), None);
        assert_eq!(policy.delay_for_attempt(100), None);
    }

    #[test]
    fn linear_ramps_and_caps() {
        let policy = ReconnectPolicy::linear(
            Duration::from_millis(50),
            Duration::from_millis(2000),
            10,
        );
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for_attempt(4), Some(Duration::from_millis(200)));
        // 50ms * 41 would be 2050ms; capped.
        let capped = ReconnectPolicy::linear(
            Duration::from_millis(500),
            Duration::from_millis(1200),
            10,
        );
        assert_eq!(capped.delay_for_attempt(5), Some(Duration::from_millis(1200)));
    }

    #[test]
    fn exhausted_budget_is_terminal() {
        let policy =
            ReconnectPolicy::linear(Duration::from_millis(50), Duration::from_millis(2000), 3);
        assert!(policy.delay_for_attempt(3).is_some());
        assert_eq!(policy.delay_for_attempt(4), None);
    }

    #[test]
    fn default_matches_configured_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(50)));
        assert_eq!(
            policy.delay_for_attempt(100),
            None,
            "default budget is 10 retries"
        );
    }

    #[test]
    fn cluster_mode_gets_no_policy() {
        let cluster = ConnectionMode::Cluster { nodes: vec![] };
        let policy = ReconnectPolicy::for_mode(&cluster, &RetrySettings::default());
        assert_eq!(policy, ReconnectPolicy::None);

        let single = ConnectionMode::Single {
            addr: Addr::new("localhost", 6379),
        };
        let policy = ReconnectPolicy::for_mode(&single, &RetrySettings::default());
        assert!(matches!(policy, ReconnectPolicy::Linear { .. }));
    }
}
