//! Retry loop for versioned movie writes

use crate::errors::{AppError, Result};
use crate::metrics;
use backoff::{future::retry, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const INITIAL_INTERVAL: Duration = Duration::from_millis(5);
const MAX_INTERVAL: Duration = Duration::from_millis(250);

/// Run a read-modify-write `attempt` until it stops losing version races.
///
/// Only `WriteConflict` is retried. Every other error, and the last
/// conflict once `budget` is spent, goes back to the caller.
pub(crate) async fn retry_versioned<T, F, Fut>(operation: &'static str, budget: Duration, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(INITIAL_INTERVAL)
        .with_max_interval(MAX_INTERVAL)
        .with_max_elapsed_time(Some(budget))
        .build();

    retry(policy, || {
        let pending = attempt();
        async move {
            pending.await.map_err(|err: AppError| {
                if err.is_write_conflict() {
                    warn!(operation, error = %err, "Versioned write lost a race, retrying");
                    metrics::record_write_conflict(operation);
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_versioned("test", Duration::from_secs(2), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::WriteConflict { id: Uuid::nil() })
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_versioned("test", Duration::from_secs(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::MovieNotFound { id: Uuid::nil() })
        })
        .await;

        assert!(matches!(result, Err(AppError::MovieNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let result: Result<()> = retry_versioned("test", Duration::from_millis(30), || async {
            Err(AppError::WriteConflict { id: Uuid::nil() })
        })
        .await;

        assert!(matches!(result, Err(AppError::WriteConflict { .. })));
    }
}
