//! Single-flight deduplication for backend requests.
//!
//! Concurrent callers asking for the same key share one in-flight fetch and
//! all observe its result. The table entry exists exactly while the fetch is
//! outstanding; it is removed when the fetch settles, success or failure, so
//! a failed attempt never blocks the next one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::api::ApiError;
use crate::lock::mutex_lock;

type InFlight<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

pub struct RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    in_flight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `factory` under single-flight semantics for `key`.
    ///
    /// If a request for `key` is already outstanding, this joins it instead
    /// of calling `factory`. The underlying fetch is driven by a detached
    /// task, so it runs to completion even if every caller stops polling.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let shared = {
            let mut table = mutex_lock(&self.in_flight, "dedupe");
            if let Some(existing) = table.get(key) {
                debug!(key, "Joining in-flight request");
                existing.clone()
            } else {
                let fut = factory();
                let table_handle = Arc::clone(&self.in_flight);
                let cleanup_key = key.to_string();
                let wrapped = async move {
                    let result = fut.await;
                    // Remove on success and failure alike; a lingering entry
                    // would pin a failed result forever
                    mutex_lock(&table_handle, "dedupe").remove(&cleanup_key);
                    result
                }
                .boxed()
                .shared();

                table.insert(key.to_string(), wrapped.clone());
                tokio::spawn(wrapped.clone());
                wrapped
            }
        };

        shared.await
    }

    /// Number of currently outstanding requests.
    pub fn in_flight_count(&self) -> usize {
        mutex_lock(&self.in_flight, "dedupe").len()
    }
}

impl<T> Clone for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    fn counting_factory(
        counter: Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, ApiError>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedupe.run("recipes.list", counting_factory(calls.clone(), 7)),
            dedupe.run("recipes.list", counting_factory(calls.clone(), 8)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Both observe the first factory's result
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_caller_after_settlement_fetches_again() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        dedupe.run("k", counting_factory(calls.clone(), 1)).await.unwrap();
        assert_eq!(dedupe.in_flight_count(), 0);

        dedupe.run("k", counting_factory(calls.clone(), 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_clears_the_entry() {
        let dedupe: RequestDeduplicator<u32> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = {
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Network("connection refused".to_string())) }.boxed()
            }
        };
        let result = dedupe.run("k", failing).await;
        assert!(result.is_err());
        assert_eq!(dedupe.in_flight_count(), 0);

        // The failed attempt does not poison the next one
        dedupe.run("k", counting_factory(calls.clone(), 5)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedupe.run("recipes.get:1", counting_factory(calls.clone(), 1)),
            dedupe.run("recipes.get:2", counting_factory(calls.clone(), 2)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_entry_exists_exactly_while_outstanding() {
        let dedupe: RequestDeduplicator<u32> = RequestDeduplicator::new();
        let (release, gate) = oneshot::channel::<()>();

        let runner = {
            let dedupe = dedupe.clone();
            tokio::spawn(async move {
                dedupe
                    .run("k", move || {
                        async move {
                            let _ = gate.await;
                            Ok(9)
                        }
                        .boxed()
                    })
                    .await
            })
        };

        // Wait for the request to be registered
        for _ in 0..100 {
            if dedupe.in_flight_count() == 1 {
                break;
            }
            sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(dedupe.in_flight_count(), 1);

        release.send(()).unwrap();
        assert_eq!(runner.await.unwrap().unwrap(), 9);
        assert_eq!(dedupe.in_flight_count(), 0);
    }
}
