//! Outbox configuration and retry backoff.

use std::time::Duration;

/// Configuration for flush cadence and retry behavior.
///
/// # Backoff Calculation
///
/// Retry delay follows exponential backoff: `backoff_base * 2^(attempts - 1)`
/// capped at `backoff_cap`. For the default config:
///
/// | Attempts | Delay |
/// |----------|-------|
/// | 1        | 2s    |
/// | 2        | 4s    |
/// | 3        | 8s    |
/// | 4        | 16s   |
/// | 5        | 32s   |
/// | 6+       | 60s (capped) |
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Cadence of the periodic flush timer.
    pub flush_interval: Duration,
    /// Base duration for exponential backoff on retries.
    pub backoff_base: Duration,
    /// Maximum backoff duration (caps exponential growth).
    pub backoff_cap: Duration,
    /// Failed attempts a message may accumulate before it is moved to the
    /// dead-letter list.
    pub max_attempts: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5),
            backoff_base: Duration::from_millis(2000),
            backoff_cap: Duration::from_millis(60000),
            max_attempts: 5,
        }
    }
}

/// Computes the retry delay for a given attempt count.
///
/// Pure function, no state: `min(base * 2^(attempts - 1), cap)`. An attempt
/// count of zero yields zero; large counts saturate at the cap.
pub fn backoff_delay(attempts: u32, config: &OutboxConfig) -> Duration {
    if attempts == 0 {
        return Duration::ZERO;
    }

    let base_ms = config.backoff_base.as_millis() as u64;
    let cap_ms = config.backoff_cap.as_millis() as u64;
    let multiplier = 1u64.checked_shl(attempts - 1).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(multiplier).min(cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let config = OutboxConfig::default();

        assert_eq!(backoff_delay(1, &config), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2, &config), Duration::from_millis(4000));
        assert_eq!(backoff_delay(3, &config), Duration::from_millis(8000));
        assert_eq!(backoff_delay(4, &config), Duration::from_millis(16000));
        assert_eq!(backoff_delay(5, &config), Duration::from_millis(32000));
        assert_eq!(backoff_delay(6, &config), Duration::from_millis(60000));
        assert_eq!(backoff_delay(10, &config), Duration::from_millis(60000));
    }

    #[test]
    fn backoff_zero_attempts_is_zero() {
        let config = OutboxConfig::default();
        assert_eq!(backoff_delay(0, &config), Duration::ZERO);
    }

    #[test]
    fn backoff_large_attempt_count_saturates() {
        let config = OutboxConfig::default();
        assert_eq!(backoff_delay(100, &config), Duration::from_millis(60000));
        assert_eq!(backoff_delay(u32::MAX, &config), Duration::from_millis(60000));
    }

    #[test]
    fn config_default_values() {
        let config = OutboxConfig::default();
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.backoff_base, Duration::from_millis(2000));
        assert_eq!(config.backoff_cap, Duration::from_millis(60000));
        assert_eq!(config.max_attempts, 5);
    }
}
