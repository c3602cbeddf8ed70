//! Token-bucket rate limiting for the upstream APIs.
//!
//! One background task owns every bucket; callers talk to it through a
//! cloneable [`RateLimiter`] handle. Buckets refill once per second and
//! waiters are served strictly FIFO on each refill tick.
//!
//! Known buckets:
//!
//! | bucket  | capacity | refill  |
//! |---------|----------|---------|
//! | `clob`  | 120      | 2/s     |
//! | `data`  | 60       | 1/s     |
//! | `gamma` | 60       | 1/s     |
//!
//! Unknown bucket names are allowed through without throttling (logged the
//! first time) so new callers cannot dead-lock on a missing configuration
//! entry.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Well-known bucket names.
pub mod buckets {
    pub const CLOB: &str = "clob";
    pub const DATA: &str = "data";
    pub const GAMMA: &str = "gamma";
}

/// Default ceiling for a blocking [`RateLimiter::acquire`].
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(120);

const REFILL_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// Blocking acquire timed out before a token freed up.
    #[error("timed out waiting for a `{0}` token")]
    Timeout(String),

    /// Non-blocking acquire found the bucket empty.
    #[error("bucket `{0}` is exhausted")]
    RateLimited(String),

    /// The limiter task is gone (shutdown).
    #[error("rate limiter stopped")]
    Closed,
}

enum Command {
    TryAcquire {
        bucket: String,
        reply: oneshot::Sender<Result<(), RateLimitError>>,
    },
    Acquire {
        bucket: String,
        reply: oneshot::Sender<()>,
    },
}

struct Bucket {
    tokens: u32,
    capacity: u32,
    refill_per_tick: u32,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl Bucket {
    fn new(capacity: u32, refill_per_tick: u32) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_tick,
            waiters: VecDeque::new(),
        }
    }

    fn refill(&mut self) {
        self.tokens = (self.tokens + self.refill_per_tick).min(self.capacity);
        // Serve queued waiters in arrival order, one token each. A waiter
        // whose receiver timed out is skipped without spending a token.
        while self.tokens > 0 {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.send(()).is_ok() {
                self.tokens -= 1;
            }
        }
    }
}

/// Cloneable handle to the limiter task.
#[derive(Clone)]
pub struct RateLimiter {
    tx: mpsc::Sender<Command>,
}

impl RateLimiter {
    /// Spawn the limiter task with the standard bucket set.
    pub fn start() -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(buckets::CLOB.to_string(), Bucket::new(120, 2));
        buckets.insert(buckets::DATA.to_string(), Bucket::new(60, 1));
        buckets.insert(buckets::GAMMA.to_string(), Bucket::new(60, 1));
        Self::start_with(buckets)
    }

    fn start_with(buckets: HashMap<String, Bucket>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(run(buckets, rx));
        Self { tx }
    }

    /// Block until a token is available or `timeout` elapses.
    pub async fn acquire(&self, bucket: &str, timeout: Duration) -> Result<(), RateLimitError> {
        let (reply, granted) = oneshot::channel();
        self.tx
            .send(Command::Acquire {
                bucket: bucket.to_string(),
                reply,
            })
            .await
            .map_err(|_| RateLimitError::Closed)?;

        match tokio::time::timeout(timeout, granted).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RateLimitError::Closed),
            Err(_) => Err(RateLimitError::Timeout(bucket.to_string())),
        }
    }

    /// Take a token if one is available right now.
    pub async fn try_acquire(&self, bucket: &str) -> Result<(), RateLimitError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(Command::TryAcquire {
                bucket: bucket.to_string(),
                reply,
            })
            .await
            .map_err(|_| RateLimitError::Closed)?;
        result.await.map_err(|_| RateLimitError::Closed)?
    }
}

async fn run(mut buckets: HashMap<String, Bucket>, mut rx: mpsc::Receiver<Command>) {
    let mut unknown_seen: HashSet<String> = HashSet::new();
    let mut refill = tokio::time::interval(REFILL_PERIOD);
    refill.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = refill.tick() => {
                for bucket in buckets.values_mut() {
                    bucket.refill();
                }
            }
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("all rate limiter handles dropped, stopping");
                    return;
                };
                handle(&mut buckets, &mut unknown_seen, cmd);
            }
        }
    }
}

fn handle(buckets: &mut HashMap<String, Bucket>, unknown_seen: &mut HashSet<String>, cmd: Command) {
    match cmd {
        Command::TryAcquire { bucket, reply } => {
            let result = match buckets.get_mut(&bucket) {
                Some(b) if b.tokens > 0 => {
                    b.tokens -= 1;
                    Ok(())
                }
                Some(_) => Err(RateLimitError::RateLimited(bucket)),
                None => {
                    warn_unknown(unknown_seen, &bucket);
                    Ok(())
                }
            };
            let _ = reply.send(result);
        }
        Command::Acquire { bucket, reply } => match buckets.get_mut(&bucket) {
            Some(b) if b.tokens > 0 => {
                b.tokens -= 1;
                let _ = reply.send(());
            }
            Some(b) => b.waiters.push_back(reply),
            None => {
                warn_unknown(unknown_seen, &bucket);
                let _ = reply.send(());
            }
        },
    }
}

fn warn_unknown(seen: &mut HashSet<String>, bucket: &str) {
    if seen.insert(bucket.to_string()) {
        warn!(bucket = %bucket, "unknown rate limit bucket, allowing through");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_limiter() -> RateLimiter {
        let mut buckets = HashMap::new();
        buckets.insert("tiny".to_string(), Bucket::new(2, 1));
        RateLimiter::start_with(buckets)
    }

    #[tokio::test]
    async fn try_acquire_drains_then_limits() {
        let limiter = tiny_limiter();

        assert_eq!(limiter.try_acquire("tiny").await, Ok(()));
        assert_eq!(limiter.try_acquire("tiny").await, Ok(()));
        assert_eq!(
            limiter.try_acquire("tiny").await,
            Err(RateLimitError::RateLimited("tiny".to_string()))
        );
    }

    #[tokio::test]
    async fn unknown_buckets_pass_through() {
        let limiter = tiny_limiter();
        for _ in 0..10 {
            assert_eq!(limiter.try_acquire("not-configured").await, Ok(()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_refill() {
        let limiter = tiny_limiter();
        limiter.try_acquire("tiny").await.unwrap();
        limiter.try_acquire("tiny").await.unwrap();

        // Bucket empty; the next acquire parks until the 1 s refill tick.
        let acquired = tokio::spawn({
            let limiter = limiter.clone();
            async move { limiter.acquire("tiny", Duration::from_secs(10)).await }
        });

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(acquired.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_times_out_when_starved() {
        let mut buckets = HashMap::new();
        // Refill of zero: the bucket never recovers.
        buckets.insert("dead".to_string(), Bucket::new(1, 0));
        let limiter = RateLimiter::start_with(buckets);

        limiter.try_acquire("dead").await.unwrap();
        let err = limiter.acquire("dead", Duration::from_secs(2)).await;
        assert_eq!(err, Err(RateLimitError::Timeout("dead".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_in_fifo_order() {
        let mut buckets = HashMap::new();
        buckets.insert("one".to_string(), Bucket::new(1, 1));
        let limiter = RateLimiter::start_with(buckets);
        limiter.try_acquire("one").await.unwrap();

        let first = tokio::spawn({
            let l = limiter.clone();
            async move {
                l.acquire("one", Duration::from_secs(30)).await.unwrap();
                tokio::time::Instant::now()
            }
        });
        // Give the first waiter time to enqueue before the second.
        tokio::time::advance(Duration::from_millis(10)).await;
        let second = tokio::spawn({
            let l = limiter.clone();
            async move {
                l.acquire("one", Duration::from_secs(30)).await.unwrap();
                tokio::time::Instant::now()
            }
        });

        tokio::time::advance(Duration::from_secs(3)).await;
        let t1 = first.await.unwrap();
        let t2 = second.await.unwrap();
        assert!(t1 <= t2, "first waiter served after second");
    }
}
