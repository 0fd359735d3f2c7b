//! Cancellable wait primitive (§5 Cancellation).
//!
//! Internal waits on an observable predicate must be abortable without
//! turning cancellation into an error: "a cancelled wait must resolve to a
//! never-settling future, not throw." [`cancellable`] honors that literally
//! — on cancellation the returned future simply never completes, rather
//! than resolving to `Err` or `None`.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`. If `token` is cancelled first, the future
/// returned by this function never resolves; callers that need to give up
/// must race this themselves (e.g. with `tokio::time::timeout` or their own
/// outer cancellation).
pub async fn cancellable<F>(token: &CancellationToken, fut: F) -> F::Output
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => std::future::pending().await,
        out = fut => out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_with_inner_future_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = cancellable(&token, async { 42 }).await;
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn never_settles_once_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            cancellable(&token, std::future::pending::<()>()),
        )
        .await;
        assert!(result.is_err(), "cancelled wait must not resolve");
    }
}
