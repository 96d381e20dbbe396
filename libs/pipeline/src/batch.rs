//! Batch LLM Executor: bounded-concurrency fan-out over a list of items,
//! each call retried with exponential backoff, the whole batch
//! cancellable and individually timeoutable.
//!
//! Results are returned in input order regardless of completion order,
//! so callers can zip them back against their source items.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Error, Clone)]
pub enum BatchItemError {
    #[error("call failed: {0}")]
    Call(String),
    #[error("call exceeded timeout")]
    Timeout,
    #[error("batch was canceled")]
    Canceled,
}

/// One call in a batch. Implementors decide which errors are worth
/// retrying (e.g. rate limits) vs. failing the item immediately (e.g.
/// invalid input) by returning `retryable: false`.
#[async_trait]
pub trait BatchCall<I: Send + Sync, O: Send>: Send + Sync {
    async fn call(&self, item: &I, context: &serde_json::Value) -> Result<O, BatchCallError>;
}

#[derive(Debug, Clone)]
pub struct BatchCallError {
    pub message: String,
    pub retryable: bool,
}

impl BatchCallError {
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

pub struct BatchOptions {
    pub max_concurrent: usize,
    pub timeout: Option<Duration>,
    /// Mirrors `ctx.metadata["no_cache"]`: `cache = !no_cache`.
    pub cache: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            timeout: None,
            cache: true,
        }
    }
}

fn retry_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        multiplier: 4.0,
        max_interval: Duration::from_secs(8),
        max_elapsed_time: None,
        ..Default::default()
    }
}

async fn call_with_retry<I, O, C>(
    caller: &C,
    item: &I,
    context: &serde_json::Value,
) -> Result<O, BatchItemError>
where
    I: Send + Sync,
    O: Send,
    C: BatchCall<I, O>,
{
    let mut backoff = retry_backoff();
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        match caller.call(item, context).await {
            Ok(v) => return Ok(v),
            Err(e) if e.retryable && attempt < MAX_ATTEMPTS => {
                if let Some(delay) = backoff.next_backoff() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(BatchItemError::Call(e.message)),
        }
    }
}

/// Run `items` through `caller`, at most `opts.max_concurrent` in flight at
/// once, returning one result per item in original order.
pub async fn run_batch<I, O, C>(
    caller: Arc<C>,
    items: Vec<I>,
    opts: BatchOptions,
    context: serde_json::Value,
    cancel: CancellationToken,
    on_progress: Option<Arc<dyn Fn(BatchProgress) + Send + Sync>>,
) -> Vec<Result<O, BatchItemError>>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
    C: BatchCall<I, O> + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(opts.max_concurrent.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut pending: FuturesUnordered<
        Pin<Box<dyn Future<Output = (usize, Result<O, BatchItemError>)> + Send>>,
    > = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let caller = caller.clone();
        let cancel = cancel.clone();
        let context = context.clone();
        let on_progress = on_progress.clone();
        let completed = completed.clone();
        let timeout = opts.timeout;

        pending.push(Box::pin(async move {
            let permit = semaphore.acquire_owned().await;
            let result = if cancel.is_cancelled() || permit.is_err() {
                Err(BatchItemError::Canceled)
            } else {
                let call_fut = call_with_retry(caller.as_ref(), &item, &context);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(BatchItemError::Canceled),
                    result = run_with_optional_timeout(call_fut, timeout) => result,
                }
            };
            let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(cb) = &on_progress {
                cb(BatchProgress { completed: n, total });
            }
            (idx, result)
        }));
    }

    let mut slots: Vec<Option<Result<O, BatchItemError>>> = (0..total).map(|_| None).collect();
    while let Some((idx, result)) = pending.next().await {
        slots[idx] = Some(result);
    }

    slots
        .into_iter()
        .map(|s| s.unwrap_or(Err(BatchItemError::Canceled)))
        .collect()
}

async fn run_with_optional_timeout<O>(
    fut: impl Future<Output = Result<O, BatchItemError>>,
    timeout: Option<Duration>,
) -> Result<O, BatchItemError> {
    match timeout {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .unwrap_or(Err(BatchItemError::Timeout)),
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct CountingCaller {
        fail_first_n: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BatchCall<i32, i32> for CountingCaller {
        async fn call(&self, item: &i32, _context: &serde_json::Value) -> Result<i32, BatchCallError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                Err(BatchCallError::retryable("simulated transient failure"))
            } else {
                Ok(*item * 2)
            }
        }
    }

    #[tokio::test]
    async fn results_are_returned_in_input_order() {
        let caller = Arc::new(CountingCaller {
            fail_first_n: 0,
            calls: AtomicU32::new(0),
        });
        let items = vec![1, 2, 3, 4, 5];
        let results = run_batch(
            caller,
            items,
            BatchOptions::default(),
            serde_json::json!({}),
            CancellationToken::new(),
            None,
        )
        .await;
        let values: Vec<i32> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn permanent_errors_do_not_retry() {
        struct AlwaysFails;
        #[async_trait]
        impl BatchCall<i32, i32> for AlwaysFails {
            async fn call(&self, _item: &i32, _context: &serde_json::Value) -> Result<i32, BatchCallError> {
                Err(BatchCallError::permanent("bad input"))
            }
        }
        let results = run_batch(
            Arc::new(AlwaysFails),
            vec![1],
            BatchOptions::default(),
            serde_json::json!({}),
            CancellationToken::new(),
            None,
        )
        .await;
        assert!(matches!(results[0], Err(BatchItemError::Call(_))));
    }

    #[tokio::test]
    async fn cancellation_short_circuits_remaining_items() {
        let caller = Arc::new(CountingCaller {
            fail_first_n: 0,
            calls: AtomicU32::new(0),
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = run_batch(
            caller,
            vec![1, 2, 3],
            BatchOptions::default(),
            serde_json::json!({}),
            cancel,
            None,
        )
        .await;
        assert!(results.iter().all(|r| matches!(r, Err(BatchItemError::Canceled))));
    }

    #[tokio::test]
    async fn progress_callback_fires_once_per_item() {
        let caller = Arc::new(CountingCaller {
            fail_first_n: 0,
            calls: AtomicU32::new(0),
        });
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let cb: Arc<dyn Fn(BatchProgress) + Send + Sync> = Arc::new(move |_p| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        let _ = run_batch(
            caller,
            vec![1, 2, 3],
            BatchOptions::default(),
            serde_json::json!({}),
            CancellationToken::new(),
            Some(cb),
        )
        .await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
