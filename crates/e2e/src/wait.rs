//! Bounded waits over page state

use std::future::Future;
use std::time::Duration;

use pos_e2e_common::timeouts::POLL_INTERVAL;
use tracing::debug;

use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::{Page, WaitState};

/// Run two waits concurrently and return whichever yields `Some` first.
///
/// A wait that yields `None` (or whose error the caller mapped to `None`)
/// drops out of the race instead of ending it. Returns `None` if neither
/// wins before `deadline`. The loser is dropped, not driven to completion.
pub async fn first_some<T, A, B>(a: A, b: B, deadline: Duration) -> Option<T>
where
    A: Future<Output = Option<T>>,
    B: Future<Output = Option<T>>,
{
    let a = async {
        match a.await {
            Some(value) => value,
            None => std::future::pending::<T>().await,
        }
    };
    let b = async {
        match b.await {
            Some(value) => value,
            None => std::future::pending::<T>().await,
        }
    };

    tokio::time::timeout(deadline, async {
        tokio::select! {
            value = a => value,
            value = b => value,
        }
    })
    .await
    .ok()
}

/// Poll `check` until it returns `Some` or `timeout` elapses.
///
/// Errors from `check` count as "not yet".
pub async fn poll_until<T, F, Fut>(timeout: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(Some(value)) = check().await {
            return Some(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Optional check: does `locator` become visible within `window`?
///
/// Any failure, timeout included, reads as "not present".
pub async fn probe_visible<P: Page + ?Sized>(page: &P, locator: &Locator, window: Duration) -> bool {
    match page.wait_for(locator, WaitState::Visible, window).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Probe for {} ended: {}", locator, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn after<T>(delay: Duration, value: Option<T>) -> Option<T> {
        tokio::time::sleep(delay).await;
        value
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_some_takes_earliest_winner() {
        let winner = first_some(
            after(Duration::from_secs(3), Some("navigated")),
            after(Duration::from_secs(1), Some("error")),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(winner, Some("error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_some_ignores_early_none() {
        // The error wait gives up first; it must not end the race
        let winner = first_some(
            after(Duration::from_secs(5), Some("navigated")),
            after(Duration::from_secs(1), None),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(winner, Some("navigated"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_some_times_out() {
        let start = tokio::time::Instant::now();
        let winner: Option<&str> = first_some(
            after(Duration::from_secs(120), Some("late")),
            after(Duration::from_secs(1), None),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(winner, None);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until() {
        let mut calls = 0;
        let found = poll_until(Duration::from_secs(5), || {
            calls += 1;
            let n = calls;
            async move { Ok((n >= 3).then_some(n)) }
        })
        .await;
        assert_eq!(found, Some(3));

        let never: Option<()> =
            poll_until(Duration::from_millis(500), || async { Ok(None) }).await;
        assert_eq!(never, None);
    }
}
