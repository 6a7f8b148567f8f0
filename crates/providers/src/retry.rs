use std::future::Future;
use std::time::Duration;

use dexter_core::{Error, Result};
use tracing::warn;

/// Run `op` up to `max_attempts` times, sleeping `base_delay * 2^attempt`
/// between failures. The last error is propagated unchanged; callers decide
/// their own fallback.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, base_delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = Error::Provider("No attempts were made".to_string());
    for attempt in 0..max_attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt = attempt + 1, max_attempts, error = %e, "Attempt failed");
                last_error = e;
            }
        }
        if attempt + 1 < max_attempts {
            tokio::time::sleep(backoff(base_delay, attempt)).await;
        }
    }
    Err(last_error)
}

/// Exponential backoff that saturates instead of overflowing, so a generous
/// `max_attempts` configuration cannot panic the retry loop.
fn backoff(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_saturates_for_large_attempts() {
        assert_eq!(
            backoff(Duration::from_millis(500), 2),
            Duration::from_millis(2000)
        );
        // 2^40 overflows u32; the delay must clamp rather than panic.
        let long = backoff(Duration::from_millis(500), 40);
        assert!(long >= backoff(Duration::from_millis(500), 31));
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(7) }
        })
        .await
        .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Provider("transient".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_propagates_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Provider("still down".into())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(Error::Provider(msg)) => assert_eq!(msg, "still down"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
