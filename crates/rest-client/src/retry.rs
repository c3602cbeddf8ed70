//! Retry executor with per-class backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::RestError;

/// Total attempts per logical request.
pub const MAX_ATTEMPTS: u32 = 3;

const TRANSPORT_CAP: Duration = Duration::from_secs(5);

/// Backoff before retry number `attempt` (1-based, the attempt that just
/// failed) for the given error class.
pub fn retry_delay(err: &RestError, attempt: u32) -> Duration {
    match err {
        RestError::Timeout { .. } | RestError::Connection { .. } => {
            Duration::from_millis(500 * u64::from(attempt * attempt)).min(TRANSPORT_CAP)
        }
        RestError::RateLimited { .. } => Duration::from_secs(2 * u64::from(attempt)),
        RestError::ServerFault { .. } => Duration::from_secs(1),
        _ => Duration::ZERO,
    }
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping between retryable
/// failures. Non-retryable errors surface immediately.
pub async fn with_retry<T, F, Fut>(endpoint: &str, mut op: F) -> Result<T, RestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RestError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                let delay = retry_delay(&err, attempt);
                tracing::debug!(
                    endpoint = %endpoint,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transport(endpoint: &str) -> RestError {
        RestError::Connection {
            endpoint: endpoint.to_string(),
            message: "reset".to_string(),
        }
    }

    #[test]
    fn delay_classes() {
        let t = transport("/x");
        assert_eq!(retry_delay(&t, 1), Duration::from_millis(500));
        assert_eq!(retry_delay(&t, 2), Duration::from_millis(2000));
        assert_eq!(retry_delay(&t, 3), Duration::from_millis(4500));
        assert_eq!(retry_delay(&t, 4), Duration::from_secs(5)); // capped

        let rl = RestError::RateLimited {
            endpoint: "/x".to_string(),
        };
        assert_eq!(retry_delay(&rl, 1), Duration::from_secs(2));
        assert_eq!(retry_delay(&rl, 2), Duration::from_secs(4));

        let sf = RestError::ServerFault {
            status: 502,
            endpoint: "/x".to_string(),
            message: String::new(),
        };
        assert_eq!(retry_delay(&sf, 1), Duration::from_secs(1));
        assert_eq!(retry_delay(&sf, 2), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_errors_up_to_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("/probe", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transport("/probe")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retry("/probe", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(transport("/probe"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bad_requests_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("/order", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RestError::BadRequest {
                    status: 400,
                    endpoint: "/order".to_string(),
                    message: "invalid amounts".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(RestError::BadRequest { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
