//! Coordinator-wide configuration, composing each component's own config.

use oms_lock::LockManagerConfig;
use oms_outbox::DispatchConfig;
use serde::{Deserialize, Serialize};

/// Tuning knobs for one [`crate::Coordinator`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Lock acquisition tuning (retry delay, wait timeout, lease TTL).
    #[serde(default)]
    pub lock: LockConfigMirror,
    /// Outbox dispatch tuning (max attempts, backoff, batch size).
    #[serde(default)]
    pub outbox: OutboxConfigMirror,
    /// Correlation id prefix used when the caller does not supply one.
    #[serde(default = "default_correlation_prefix")]
    pub correlation_prefix: String,
}

fn default_correlation_prefix() -> String {
    "oms".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            lock: LockConfigMirror::default(),
            outbox: OutboxConfigMirror::default(),
            correlation_prefix: default_correlation_prefix(),
        }
    }
}

/// A `serde`-friendly mirror of [`LockManagerConfig`] (whose fields are
/// `std::time::Duration`, not directly `Deserialize`-derivable in seconds
/// form without a shim).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfigMirror {
    /// Lease length, seconds.
    pub default_ttl_secs: u64,
    /// Retry spacing, milliseconds.
    pub retry_delay_ms: u64,
    /// Total wait budget, seconds.
    pub wait_timeout_secs: u64,
}

impl Default for LockConfigMirror {
    fn default() -> Self {
        LockConfigMirror { default_ttl_secs: 300, retry_delay_ms: 100, wait_timeout_secs: 30 }
    }
}

impl LockConfigMirror {
    /// Render into the concrete config type the lock manager expects.
    pub fn to_lock_manager_config(&self) -> LockManagerConfig {
        LockManagerConfig {
            default_ttl: std::time::Duration::from_secs(self.default_ttl_secs),
            retry_delay: std::time::Duration::from_millis(self.retry_delay_ms),
            wait_timeout: std::time::Duration::from_secs(self.wait_timeout_secs),
        }
    }
}

/// A `serde`-friendly mirror of [`DispatchConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfigMirror {
    /// Attempts before dead-lettering.
    pub max_attempts: u32,
    /// Base backoff, seconds.
    pub base_backoff_secs: i64,
    /// Backoff ceiling, seconds.
    pub max_backoff_secs: i64,
    /// Envelopes drained per dispatch sweep.
    pub batch_size: usize,
}

impl Default for OutboxConfigMirror {
    fn default() -> Self {
        let d = DispatchConfig::default();
        OutboxConfigMirror {
            max_attempts: d.max_attempts,
            base_backoff_secs: d.base_backoff_secs,
            max_backoff_secs: d.max_backoff_secs,
            batch_size: d.batch_size,
        }
    }
}

impl OutboxConfigMirror {
    /// Render into the concrete config type the dispatcher expects.
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_attempts: self.max_attempts,
            base_backoff_secs: self.base_backoff_secs,
            max_backoff_secs: self.max_backoff_secs,
            batch_size: self.batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_stated_values() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.lock.wait_timeout_secs, 30);
        assert_eq!(config.lock.retry_delay_ms, 100);
    }
}
