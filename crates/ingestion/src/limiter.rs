//! Semaphore-gated fan-out.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{IngestError, Result};

/// Why a task submitted to [`ConcurrencyLimiter::run`] produced no value.
#[derive(Debug)]
pub enum TaskFailure<E> {
    /// The task ran and returned an error.
    Failed(E),
    /// The task panicked or was cancelled.
    Aborted(String),
}

impl<E: fmt::Display> fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Failed(e) => write!(f, "{}", e),
            TaskFailure::Aborted(reason) => write!(f, "task aborted: {}", reason),
        }
    }
}

/// Runs futures on the tokio runtime with at most `limit` in flight.
///
/// Permits are acquired in submission order before each spawn, so tasks are
/// admitted FIFO. Every task runs exactly once and a failure never cancels
/// its siblings.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(IngestError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every task and return their results in submission order once all
    /// have settled.
    pub async fn run<F, T, E>(&self, tasks: Vec<F>) -> Vec<std::result::Result<T, TaskFailure<E>>>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let total = tasks.len();
        let mut handles: Vec<Option<JoinHandle<std::result::Result<T, E>>>> =
            Vec::with_capacity(total);

        for task in tasks {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Semaphore closed, task not started");
                    handles.push(None);
                    continue;
                }
            };

            handles.push(Some(tokio::spawn(async move {
                let _permit = permit;
                task.await
            })));
        }

        debug!(tasks = total, limit = self.limit, "All tasks admitted");

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            let result = match handle {
                Some(handle) => match handle.await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskFailure::Failed(e)),
                    Err(e) => {
                        error!(error = %e, "Task panicked");
                        Err(TaskFailure::Aborted(e.to_string()))
                    }
                },
                None => Err(TaskFailure::Aborted("not started".to_string())),
            };
            results.push(result);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(
            ConcurrencyLimiter::new(0),
            Err(IngestError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();

        // Later tasks finish first
        let tasks: Vec<_> = (0..6u64)
            .map(|i| async move {
                tokio::time::sleep(Duration::from_millis(60 - i * 10)).await;
                Ok::<_, String>(i)
            })
            .collect();

        let results = limiter.run(tasks).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let limiter = ConcurrencyLimiter::new(5).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let executed = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                let executed = executed.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    executed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .collect();

        let results = limiter.run(tasks).await;

        assert_eq!(results.len(), 20);
        assert_eq!(executed.load(Ordering::SeqCst), 20);
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();

        let tasks: Vec<_> = (0..5)
            .map(|i| async move {
                if i == 1 {
                    Err(format!("item {} failed", i))
                } else {
                    Ok(i)
                }
            })
            .collect();

        let results = limiter.run(tasks).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
        match &results[1] {
            Err(TaskFailure::Failed(msg)) => assert_eq!(msg, "item 1 failed"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    async fn explode_on_two(i: i32) -> std::result::Result<i32, String> {
        if i == 2 {
            panic!("boom");
        }
        Ok(i)
    }

    #[tokio::test]
    async fn test_panic_is_reported_not_propagated() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();

        let tasks: Vec<_> = (1..=3).map(explode_on_two).collect();
        let results = limiter.run(tasks).await;

        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(matches!(results[1], Err(TaskFailure::Aborted(_))));
        assert_eq!(results[2].as_ref().unwrap(), &3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let limiter = ConcurrencyLimiter::new(5).unwrap();
        let results = limiter
            .run(Vec::<std::future::Ready<std::result::Result<(), String>>>::new())
            .await;
        assert!(results.is_empty());
    }
}
