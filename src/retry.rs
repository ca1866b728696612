/// Bounded retry with a fixed wait between attempts.
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The classifier declared the failure non-retryable.
    #[error("{description} failed with a non-retryable error")]
    NonRetryable {
        description: String,
        #[source]
        source: E,
    },

    /// All attempts were consumed; carries the last cause.
    #[error("{description} failed after {tries} tries")]
    Exhausted {
        description: String,
        tries: usize,
        #[source]
        source: E,
    },

    /// The cancellation token fired while waiting or between attempts.
    #[error("{description} cancelled")]
    Cancelled { description: String },
}

impl<E> RetryError<E> {
    /// The last underlying cause, when one exists.
    pub fn cause(&self) -> Option<&E> {
        match self {
            RetryError::NonRetryable { source, .. } | RetryError::Exhausted { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// Run `op` until it succeeds, the classifier rejects its error, the
/// attempts run out, or `cancel` fires. The wait between attempts is
/// fixed; cancellation during the wait aborts immediately.
pub async fn retry<T, E, F, Fut>(
    description: &str,
    cancel: &CancellationToken,
    max_tries: usize,
    wait: Duration,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_tries = max_tries.max(1);
    let mut last_error = None;

    for attempt in 1..=max_tries {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                description: description.to_string(),
            });
        }

        let result = tokio::select! {
            result = op() => result,
            _ = cancel.cancelled() => {
                return Err(RetryError::Cancelled {
                    description: description.to_string(),
                });
            }
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => {
                warn!(%description, error = %e, "non-retryable failure");
                return Err(RetryError::NonRetryable {
                    description: description.to_string(),
                    source: e,
                });
            }
            Err(e) => {
                debug!(%description, attempt, max_tries, error = %e, "attempt failed");
                last_error = Some(e);
            }
        }

        if attempt < max_tries {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled {
                        description: description.to_string(),
                    });
                }
            }
        }
    }

    Err(RetryError::Exhausted {
        description: description.to_string(),
        tries: max_tries,
        source: last_error.expect("at least one attempt ran"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_success_on_first_try() {
        let cancel = CancellationToken::new();
        let result: Result<i32, RetryError<std::io::Error>> = retry(
            "op",
            &cancel,
            3,
            Duration::from_millis(1),
            |_| true,
            || async { Ok(42) },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let result = retry(
            "op",
            &cancel,
            3,
            Duration::from_millis(1),
            |_: &String| true,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("boom".to_string())
                } else {
                    Ok("ok")
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_cause() {
        let cancel = CancellationToken::new();
        let result: Result<(), _> = retry(
            "op",
            &cancel,
            3,
            Duration::from_millis(1),
            |_: &String| true,
            || async { Err("boom".to_string()) },
        )
        .await;
        match result.unwrap_err() {
            RetryError::Exhausted { tries, source, .. } => {
                assert_eq!(tries, 3);
                assert_eq!(source, "boom");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry(
            "op",
            &cancel,
            5,
            Duration::from_millis(1),
            |_: &String| false,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_string())
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::NonRetryable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_beats_exhaustion() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = retry(
            "op",
            &cancel,
            3,
            Duration::from_secs(60),
            |_: &String| true,
            || async { Err("boom".to_string()) },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Cancelled { .. })));
    }
}
