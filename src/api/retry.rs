use std::{future::Future, time::Duration};

use tokio::time::sleep;

#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    Exhausted,
}

/// Runs `op` up to `max_attempts` times, sleeping `interval` between attempts, until it yields
/// a value. `op` receives the 1-based attempt number.
pub async fn retry_bounded<T, F, Fut>(
    max_attempts: u32,
    interval: Duration,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = op(attempt).await {
            return RetryOutcome::Success(value);
        }
        if attempt < max_attempts {
            sleep(interval).await;
        }
    }
    RetryOutcome::Exhausted
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_the_last_allowed_attempt() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let outcome = retry_bounded(6, Duration::from_secs(10), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { (attempt == 6).then_some(attempt) }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Success(6));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(50) && elapsed < Duration::from_secs(51));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = retry_bounded(6, Duration::from_secs(10), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_sleep() {
        let start = Instant::now();
        let outcome = retry_bounded(6, Duration::from_secs(10), |_| async { Some("ok") }).await;
        assert_eq!(outcome, RetryOutcome::Success("ok"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
