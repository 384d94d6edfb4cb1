//! Client configuration.
//!
//! All recovery policies are configuration, not hard-coded: reconnect
//! backoff, the degraded grace window, and the consumer backpressure
//! behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default first reconnect delay in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 250;

/// Default reconnect delay cap in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// Default number of connect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default number of malformed frames tolerated while degraded.
pub const DEFAULT_MAX_STRIKES: u32 = 5;

/// Default degraded wall-clock grace window in milliseconds.
pub const DEFAULT_GRACE_MS: u64 = 2_000;

/// Default consumer event buffer capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Backoff policy for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the second attempt; doubles per failure.
    pub initial_delay_ms: u64,
    /// Upper bound on the exponential delay.
    pub max_delay_ms: u64,
    /// Attempts before the client shuts down with
    /// [`ShutdownReason::RetriesExhausted`](super::ShutdownReason).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectConfig {
    /// Backoff delay before attempt number `attempt` (0-based; the first
    /// attempt has no delay).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self
            .initial_delay_ms
            .saturating_mul(1u64 << (attempt - 1).min(32));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }
}

/// Bounds on the degraded grace period.
///
/// Both a strike count and a wall-clock window apply; whichever trips
/// first declares the link dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedConfig {
    /// Malformed frames / read failures tolerated before reconnecting.
    pub max_strikes: u32,
    /// Wall-clock grace window in milliseconds.
    pub grace_ms: u64,
}

impl Default for DegradedConfig {
    fn default() -> Self {
        Self {
            max_strikes: DEFAULT_MAX_STRIKES,
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

impl DegradedConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// What the client does when the consumer falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackpressurePolicy {
    /// Producer awaits until the consumer drains the buffer.
    Block,
    /// The oldest buffered events are dropped first; the consumer is
    /// told how many it missed.
    DropOldest,
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub reconnect: ReconnectConfig,
    pub degraded: DegradedConfig,
    /// Consumer event buffer capacity.
    pub event_capacity: usize,
    pub backpressure: BackpressurePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            degraded: DegradedConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            backpressure: BackpressurePolicy::Block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_exponential_with_cap() {
        let config = ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            max_attempts: 8,
        };
        assert_eq!(config.delay_before(0), Duration::ZERO);
        assert_eq!(config.delay_before(1), Duration::from_millis(100));
        assert_eq!(config.delay_before(2), Duration::from_millis(200));
        assert_eq!(config.delay_before(3), Duration::from_millis(400));
        assert_eq!(config.delay_before(4), Duration::from_millis(800));
        assert_eq!(config.delay_before(5), Duration::from_millis(1_000));
        assert_eq!(config.delay_before(40), Duration::from_millis(1_000));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = ClientConfig {
            backpressure: BackpressurePolicy::DropOldest,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
