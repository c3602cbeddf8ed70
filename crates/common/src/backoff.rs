use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff.
///
/// Delay for attempt `n` (zero-based) is `min(cap, base * 2^n)`, optionally
/// widened by a symmetric jitter fraction. Callers reset after a healthy
/// stretch so a single blip does not inherit a long delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            jitter: 0.0,
            attempt: 0,
        }
    }

    /// Backoff tuned for the market WebSocket: 500 ms doubling up to 5 s.
    pub fn for_reconnect() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(5)).with_jitter(0.1)
    }

    /// Add a jitter fraction in `[0.0, 1.0]`; negative values clamp to zero.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction.max(0.0);
        self
    }

    /// Delay to sleep before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base.saturating_mul(2u32.saturating_pow(self.attempt));
        let capped = exp.min(self.cap);
        self.attempt = self.attempt.saturating_add(1);

        if self.jitter == 0.0 {
            return capped;
        }
        let spread = capped.as_secs_f64() * self.jitter;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((capped.as_secs_f64() + offset).max(0.0))
    }

    /// Forget accumulated failures after a stable period.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_cap() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));

        assert_eq!(b.next_delay(), Duration::from_millis(500));
        assert_eq!(b.next_delay(), Duration::from_millis(1000));
        assert_eq!(b.next_delay(), Duration::from_millis(2000));
        assert_eq!(b.next_delay(), Duration::from_millis(4000));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));
        b.next_delay();
        b.next_delay();
        assert_eq!(b.attempt(), 2);

        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(5)).with_jitter(0.25);
        for _ in 0..20 {
            b.reset();
            let d = b.next_delay().as_secs_f64();
            assert!((1.5..=2.5).contains(&d), "delay {d} outside jitter range");
        }
    }

    #[test]
    fn negative_jitter_is_clamped() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(5)).with_jitter(-1.0);
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }
}
