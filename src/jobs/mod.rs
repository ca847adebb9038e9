//! Bulk mutation execution: the worker pool plus the background job store
//! built on top of it. The synchronous delete endpoint and background jobs
//! share [`run_bulk_mutation`] so both fold provider failures into per-item
//! result records instead of aborting the batch.

pub mod pool;
pub mod store;

pub use pool::WorkerPool;
pub use store::{Job, JobStatus, JobStore};

use crate::models::{DeleteMode, ItemResult};
use crate::provider::MailProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drive `pool` over `ids`, applying `mode` through the provider. Every id
/// yields exactly one [`ItemResult`] unless cancellation drops it unstarted.
pub async fn run_bulk_mutation(
    pool: &WorkerPool,
    provider: Arc<dyn MailProvider>,
    access_token: String,
    ids: Vec<String>,
    mode: DeleteMode,
    cancel: CancellationToken,
    on_result: impl Fn(&ItemResult) + Send + Sync + 'static,
) -> Vec<ItemResult> {
    let op = move |id: String| {
        let provider = Arc::clone(&provider);
        let access_token = access_token.clone();
        async move {
            match provider.mutate(&access_token, &id, mode).await {
                Ok(()) => ItemResult::ok(id),
                Err(err) => ItemResult::error(id, err.to_string()),
            }
        }
    };

    pool.run_with(ids, op, cancel, on_result).await
}
