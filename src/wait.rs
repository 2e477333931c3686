//! Bounded polling, the only sanctioned way to block on asynchronous page
//! state. Nothing in this crate sleeps unconditionally for correctness;
//! every suspension point names what it is waiting for and how long it is
//! willing to wait.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{Browser, Locator};
use crate::error::{Error, Result};

/// How often predicates are re-evaluated while waiting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls `predicate` until it yields a value or `timeout` elapses.
///
/// The predicate answers `Ok(None)` for "not yet"; the first `Ok(Some(_))`
/// is returned to the caller. On timeout the error carries the elapsed
/// duration and `waiting_for` so a failed wait names the condition that
/// never came true.
pub async fn until<T, F, Fut>(waiting_for: &str, timeout: Duration, mut predicate: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();

    loop {
        if let Some(value) = predicate().await? {
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(Error::Timeout {
                waiting_for: waiting_for.to_string(),
                elapsed,
            });
        }

        tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
    }
}

/// Waits for `locator` to match something on the page.
pub async fn for_element<B: Browser>(
    browser: &B,
    locator: &Locator,
    timeout: Duration,
) -> Result<B::Elem> {
    let description = locator.to_string();

    until(&description, timeout, move || async move {
        browser.find(locator).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_value_once_predicate_flips() {
        let polls = AtomicUsize::new(0);
        let counter = &polls;

        let value = until("third poll", Duration::from_secs(5), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                Ok(Some(42))
            } else {
                Ok(None)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_within_budget() {
        let timeout = Duration::from_secs(1);

        let err = until("a condition that never holds", timeout, || async {
            Ok::<Option<()>, Error>(None)
        })
        .await
        .unwrap_err();

        match err {
            Error::Timeout {
                waiting_for,
                elapsed,
            } => {
                assert_eq!(waiting_for, "a condition that never holds");
                assert!(elapsed >= timeout);
                // Paused clock: the poll loop must not overshoot by more
                // than one interval.
                assert!(elapsed <= timeout + POLL_INTERVAL);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_errors_propagate_immediately() {
        let err = until("a failing lookup", Duration::from_secs(5), || async {
            Err::<Option<()>, Error>(Error::Authentication("gone".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
    }
}
