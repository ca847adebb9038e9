//! Bounded-concurrency batch executor.
//!
//! Spawns a fixed number of cooperative worker tasks over one shared queue.
//! Each worker pops an item, runs the supplied operation, records the
//! result, then pauses for the inter-op delay before taking the next item
//! so a batch never bursts the remote service. Cancellation is advisory:
//! workers check the token at the queue-pop boundary, so an operation
//! already dispatched runs to completion and unpopped items are dropped
//! without a result.
//!
//! Results accumulate in completion order across workers, not submission
//! order; callers must not assume index correspondence.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    inter_op_delay: Duration,
}

impl WorkerPool {
    pub fn new(concurrency: usize, inter_op_delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            inter_op_delay,
        }
    }

    /// Run `op` over every item and collect the results.
    pub async fn run<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        cancel: CancellationToken,
    ) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send,
    {
        self.run_with(items, op, cancel, |_| {}).await
    }

    /// Like [`run`](Self::run), invoking `on_result` once per completed item
    /// before the result is appended. Used by the job store to publish
    /// incremental progress.
    pub async fn run_with<T, R, F, Fut, C>(
        &self,
        items: Vec<T>,
        op: F,
        cancel: CancellationToken,
        on_result: C,
    ) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send,
        C: Fn(&R) + Send + Sync + 'static,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let workers = self.concurrency.min(items.len());
        let queue = Arc::new(Mutex::new(items.into_iter().collect::<VecDeque<T>>()));
        let results = Arc::new(Mutex::new(Vec::new()));
        let op = Arc::new(op);
        let on_result = Arc::new(on_result);
        let delay = self.inter_op_delay;

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let op = Arc::clone(&op);
            let on_result = Arc::clone(&on_result);
            let cancel = cancel.clone();

            set.spawn(async move {
                loop {
                    // Pop boundary doubles as the cancellation checkpoint.
                    if cancel.is_cancelled() {
                        break;
                    }
                    let item = match queue.lock().pop_front() {
                        Some(item) => item,
                        None => break,
                    };

                    let result = op(item).await;
                    on_result(&result);
                    results.lock().push(result);

                    if queue.lock().is_empty() {
                        break;
                    }
                    tokio::time::sleep(delay).await;
                }
            });
        }

        while set.join_next().await.is_some() {}

        let collected = std::mem::take(&mut *results.lock());
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(concurrency: usize) -> WorkerPool {
        WorkerPool::new(concurrency, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn produces_one_result_per_item_with_no_duplicates() {
        let items: Vec<String> = (0..25).map(|i| format!("id-{i}")).collect();
        let results = pool(4)
            .run(
                items.clone(),
                |id: String| async move { id },
                CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), items.len());
        let unique: HashSet<&String> = results.iter().collect();
        assert_eq!(unique.len(), items.len());
    }

    #[tokio::test]
    async fn completion_order_results_still_cover_every_item() {
        let items: Vec<u32> = (0..10).collect();
        let results = pool(3)
            .run(
                items,
                |n: u32| async move {
                    // Stagger completions so workers interleave.
                    tokio::time::sleep(Duration::from_millis((10 - n as u64) % 4)).await;
                    n
                },
                CancellationToken::new(),
            )
            .await;

        let mut sorted = results.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn pre_cancelled_token_processes_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let results = pool(2)
            .run(
                vec![1, 2, 3],
                move |n: i32| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        n
                    }
                },
                cancel,
            )
            .await;

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_mid_run_keeps_completed_results_and_drops_the_rest() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        // Single worker; cancel fires after the second item completes, so
        // the pop boundary check stops the third from being taken.
        let results = pool(1)
            .run(
                vec!["a", "b", "c", "d"],
                move |id: &'static str| {
                    let trigger = trigger.clone();
                    async move {
                        if id == "b" {
                            trigger.cancel();
                        }
                        id
                    }
                },
                cancel,
            )
            .await;

        assert!(results.len() >= 2);
        assert!(results.len() < 4);
        assert_eq!(&results[..2], &["a", "b"]);
    }

    #[tokio::test]
    async fn on_result_fires_once_per_completed_item() {
        let seen = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&seen);

        let results = pool(2)
            .run_with(
                (0..8).collect::<Vec<i32>>(),
                |n: i32| async move { n },
                CancellationToken::new(),
                move |_| {
                    observer.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert_eq!(results.len(), 8);
        assert_eq!(seen.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_results() {
        let results = pool(6)
            .run(
                Vec::<String>::new(),
                |id: String| async move { id },
                CancellationToken::new(),
            )
            .await;
        assert!(results.is_empty());
    }
}
