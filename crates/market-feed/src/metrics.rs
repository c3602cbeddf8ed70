//! Feed health counters for the server's periodic status log.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Thread-safe counters owned by the feed task, readable from anywhere.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    messages_received: AtomicU64,
    events_emitted: AtomicU64,
    parse_errors: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
    subscription_attempts: AtomicU64,
    subscription_retries: AtomicU64,
    connected: AtomicBool,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_messages(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_events(&self, n: u64) {
        self.events_emitted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_successes(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_subscription_attempts(&self) {
        self.subscription_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_subscription_retries(&self) {
        self.subscription_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_successes: self.reconnect_successes.load(Ordering::Relaxed),
            subscription_attempts: self.subscription_attempts.load(Ordering::Relaxed),
            subscription_retries: self.subscription_retries.load(Ordering::Relaxed),
            connected: self.connected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub messages_received: u64,
    pub events_emitted: u64,
    pub parse_errors: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub subscription_attempts: u64,
    pub subscription_retries: u64,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = FeedMetrics::new();
        m.inc_messages();
        m.inc_messages();
        m.add_events(3);
        m.inc_subscription_attempts();
        m.inc_subscription_retries();
        m.set_connected(true);

        let snap = m.snapshot();
        assert_eq!(snap.messages_received, 2);
        assert_eq!(snap.events_emitted, 3);
        assert_eq!(snap.subscription_retries, 1);
        assert!(snap.connected);
    }
}
