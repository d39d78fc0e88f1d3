use std::time::Duration;

use crowdprice_config::PersistenceConfig;

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub min: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Backoff {
    pub fn from_config(config: &PersistenceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min: Duration::from_millis(config.backoff_min_ms),
            max: Duration::from_millis(config.backoff_max_ms),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay before retry number `retry` (0-based): `min * multiplier^retry`,
    /// capped at `max`.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.min.as_millis() as f64 * factor;
        let cap = self.max.as_millis() as f64;
        Duration::from_millis(millis.min(cap).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_then_cap() {
        let backoff = Backoff {
            max_retries: 5,
            min: Duration::from_secs(1),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        };

        let delays: Vec<_> = (0..5).map(|r| backoff.delay(r).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10]);
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(10));
    }
}
