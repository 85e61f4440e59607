//! Retry logic with exponential backoff and deadline-bounded polling

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::{KeeperError, KeeperResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    context: &str,
) -> KeeperResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = KeeperResult<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= config.max_attempts => {
                warn!(
                    "{} failed after {} attempts: {}",
                    context, attempt, e
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt, config.max_attempts, context, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;

                delay = (delay as f64 * config.exponential_base) as u64;
                delay = delay.min(config.max_delay_ms);
                let jitter = (delay as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
                delay = delay.saturating_add_signed(jitter);
            }
        }
    }
}

/// Runs `attempt` every `interval` until it yields a value or `deadline` passes.
///
/// An `Err` from `attempt` stops polling immediately. Callers that want to ride
/// out transient failures should map them to `Ok(None)`. The deadline is checked
/// before every attempt, so a 2s window polled every 500ms makes four attempts.
/// An attempt still running at the deadline is dropped.
pub async fn poll_until<F, Fut, T>(
    interval: Duration,
    deadline: Instant,
    context: &str,
    mut attempt: F,
) -> KeeperResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = KeeperResult<Option<T>>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        if Instant::now() >= deadline {
            return Err(KeeperError::DeadlineExceeded {
                context: format!("{context} ({attempts} attempts)"),
                after: started.elapsed(),
            });
        }

        attempts += 1;
        let outcome = match tokio::time::timeout_at(deadline, attempt()).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(KeeperError::DeadlineExceeded {
                    context: format!("{context} ({attempts} attempts, last one cut off)"),
                    after: started.elapsed(),
                });
            }
        };
        if let Some(value) = outcome {
            debug!(attempts, "{} completed", context);
            return Ok(value);
        }

        let wake = (Instant::now() + interval).min(deadline);
        tokio::time::sleep_until(wake).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn poll_until_gives_up_at_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: KeeperResult<()> = poll_until(
            Duration::from_millis(500),
            Instant::now() + Duration::from_secs(2),
            "order fill",
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            },
        )
        .await;

        assert!(matches!(result, Err(KeeperError::DeadlineExceeded { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_cuts_off_a_hung_attempt() {
        let started = Instant::now();

        let result: KeeperResult<()> = poll_until(
            Duration::from_millis(500),
            started + Duration::from_secs(2),
            "receipt",
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            },
        )
        .await;

        assert!(matches!(result, Err(KeeperError::DeadlineExceeded { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_returns_first_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let value = poll_until(
            Duration::from_millis(100),
            Instant::now() + Duration::from_secs(5),
            "receipt",
            || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok((n == 3).then_some(n))
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_propagates_errors() {
        let result: KeeperResult<u32> = poll_until(
            Duration::from_millis(100),
            Instant::now() + Duration::from_secs(5),
            "status",
            || async {
                Err(KeeperError::Store {
                    context: "boom".into(),
                })
            },
        )
        .await;

        assert!(matches!(result, Err(KeeperError::Store { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_returns_last_error_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            ..Default::default()
        };

        let result: KeeperResult<()> = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(KeeperError::HeadTrackerClosed)
                }
            },
            &config,
            "flaky",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
