//! Exponential delay between save attempts.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct SaveBackoff {
    base: Duration,
    max: Duration,
    current: Duration,
    jitter_ratio: f64,
}

impl SaveBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            jitter_ratio: 0.2,
        }
    }

    /// Delay before the next attempt. Doubles each call up to `max`, plus
    /// up to 20% jitter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        with_jitter(delay, self.jitter_ratio)
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let spread_ms = (delay.as_millis() as f64 * ratio) as u64;
    if spread_ms == 0 {
        return delay;
    }
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    delay + Duration::from_millis(seed % (spread_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_then_cap() {
        let mut backoff = SaveBackoff::new(Duration::from_millis(100), Duration::from_millis(300));
        let first = backoff.next_delay();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(120));
        let second = backoff.next_delay();
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(240));
        let third = backoff.next_delay();
        assert!(third >= Duration::from_millis(300) && third <= Duration::from_millis(360));
        let fourth = backoff.next_delay();
        assert!(fourth <= Duration::from_millis(360));
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut backoff = SaveBackoff::new(Duration::from_millis(50), Duration::from_secs(1));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert!(backoff.next_delay() <= Duration::from_millis(60));
    }
}
