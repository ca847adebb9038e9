//! Background job registry.
//!
//! Jobs live in a keyed map so a new submission can never tear another
//! job's entry; each job's fields are mutated only from its own detached
//! execution task, while status polls read cloned snapshots. Cancellation
//! flows through a per-job [`CancellationToken`] that the worker pool
//! observes at queue-pop boundaries.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::config::JobConfig;
use crate::jobs::pool::WorkerPool;
use crate::jobs::run_bulk_mutation;
use crate::models::{DeleteMode, ItemResult};
use crate::provider::MailProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled)
    }
}

/// Snapshot of one background bulk-mutation job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub mode: DeleteMode,
    pub total: usize,
    pub processed: usize,
    pub results: Vec<ItemResult>,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct JobHandle {
    job: Job,
    cancel: CancellationToken,
}

pub struct JobStore {
    jobs: DashMap<String, JobHandle>,
    next_id: AtomicU64,
    pool: WorkerPool,
}

impl JobStore {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            jobs: DashMap::new(),
            next_id: AtomicU64::new(1),
            pool: WorkerPool::new(config.concurrency, config.inter_op_delay),
        }
    }

    /// Register a job and start its detached execution. Returns the job id
    /// immediately; completion is observed by polling [`snapshot`](Self::snapshot).
    pub fn submit(
        self: &Arc<Self>,
        provider: Arc<dyn MailProvider>,
        access_token: String,
        ids: Vec<String>,
        mode: DeleteMode,
    ) -> String {
        let id = format!("job-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let job = Job {
            id: id.clone(),
            status: JobStatus::Queued,
            mode,
            total: ids.len(),
            processed: 0,
            results: Vec::new(),
            cancelled: false,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.jobs.insert(
            id.clone(),
            JobHandle {
                job,
                cancel: cancel.clone(),
            },
        );

        log::info!("job {}: submitted ({} items, {:?})", id, ids.len(), mode);

        // Detached from the submitting request so the job always reaches a
        // terminal status even after the response is sent.
        let store = Arc::clone(self);
        let job_id = id.clone();
        tokio::spawn(async move {
            store.execute(job_id, provider, access_token, ids, mode, cancel).await;
        });

        id
    }

    async fn execute(
        self: Arc<Self>,
        job_id: String,
        provider: Arc<dyn MailProvider>,
        access_token: String,
        ids: Vec<String>,
        mode: DeleteMode,
        cancel: CancellationToken,
    ) {
        self.update(&job_id, |job| job.status = JobStatus::Running);

        let progress_store = Arc::clone(&self);
        let progress_id = job_id.clone();
        let on_result = move |result: &ItemResult| {
            let result = result.clone();
            progress_store.update(&progress_id, |job| {
                job.processed += 1;
                job.results.push(result);
            });
        };

        run_bulk_mutation(&self.pool, provider, access_token, ids, mode, cancel.clone(), on_result)
            .await;

        let final_status = if cancel.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::Done
        };
        self.update(&job_id, |job| {
            job.status = final_status;
            job.finished_at = Some(Utc::now());
        });
        log::info!("job {}: finished as {:?}", job_id, final_status);
    }

    fn update(&self, job_id: &str, mutate: impl FnOnce(&mut Job)) {
        if let Some(mut handle) = self.jobs.get_mut(job_id) {
            mutate(&mut handle.job);
        }
    }

    /// Read-only clone of the job's current state.
    pub fn snapshot(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|handle| handle.job.clone())
    }

    /// Raise the advisory cancel flag. In-flight operations still complete;
    /// workers stop at their next queue pop. Idempotent, also on terminal
    /// jobs. Returns false for unknown ids.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.jobs.get_mut(job_id) {
            Some(mut handle) => {
                if !handle.job.status.is_terminal() {
                    handle.job.cancelled = true;
                    handle.cancel.cancel();
                    log::info!("job {}: cancellation requested", job_id);
                }
                true
            }
            None => false,
        }
    }

    /// Drop terminal jobs that finished more than `retention` ago.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, handle| {
            !(handle.job.status.is_terminal()
                && handle.job.finished_at.is_some_and(|at| at < cutoff))
        });
        before - self.jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ListPage, ProviderError};
    use std::time::Duration;

    struct FlakyProvider {
        fail_ids: Vec<String>,
    }

    #[rocket::async_trait]
    impl MailProvider for FlakyProvider {
        async fn list(
            &self,
            _access_token: &str,
            _query: &str,
            _page_token: Option<&str>,
            _page_size: u32,
        ) -> Result<ListPage, ProviderError> {
            unimplemented!("not used by job tests")
        }

        async fn get_metadata(
            &self,
            _access_token: &str,
            id: &str,
        ) -> Result<crate::models::ItemMetadata, ProviderError> {
            unimplemented!("not used by job tests: {id}")
        }

        async fn mutate(
            &self,
            _access_token: &str,
            id: &str,
            _mode: DeleteMode,
        ) -> Result<(), ProviderError> {
            if self.fail_ids.iter().any(|f| f == id) {
                Err(ProviderError::MessageNotFound(id.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn fast_config() -> JobConfig {
        JobConfig {
            concurrency: 1,
            inter_op_delay: Duration::from_millis(1),
            retention: Duration::from_secs(3600),
            reap_interval: Duration::from_secs(60),
        }
    }

    async fn wait_terminal(store: &Arc<JobStore>, id: &str) -> Job {
        for _ in 0..500 {
            if let Some(job) = store.snapshot(id) {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {id} did not reach a terminal status");
    }

    #[tokio::test]
    async fn mixed_failure_job_completes_with_per_item_results() {
        let store = Arc::new(JobStore::new(&fast_config()));
        let provider = Arc::new(FlakyProvider {
            fail_ids: vec!["b".to_string()],
        });

        let id = store.submit(
            provider,
            "token".to_string(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            DeleteMode::Trash,
        );

        let job = wait_terminal(&store, &id).await;
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.processed, 3);
        assert_eq!(job.total, 3);
        assert!(!job.cancelled);
        assert!(job.finished_at.is_some());

        let status_of = |wanted: &str| {
            job.results
                .iter()
                .find(|r| r.id == wanted)
                .map(|r| r.status)
                .expect("result present")
        };
        assert_eq!(status_of("a"), crate::models::ItemStatus::Ok);
        assert_eq!(status_of("b"), crate::models::ItemStatus::Error);
        assert_eq!(status_of("c"), crate::models::ItemStatus::Ok);
    }

    #[tokio::test]
    async fn job_ids_are_monotonic() {
        let store = Arc::new(JobStore::new(&fast_config()));
        let provider = Arc::new(FlakyProvider { fail_ids: vec![] });

        let first = store.submit(
            Arc::clone(&provider) as Arc<dyn MailProvider>,
            "token".to_string(),
            vec!["a".to_string()],
            DeleteMode::Trash,
        );
        let second = store.submit(
            provider,
            "token".to_string(),
            vec!["b".to_string()],
            DeleteMode::Delete,
        );
        assert_eq!(first, "job-1");
        assert_eq!(second, "job-2");
    }

    #[tokio::test]
    async fn cancelled_job_ends_cancelled_not_done() {
        let store = Arc::new(JobStore::new(&fast_config()));
        let provider = Arc::new(FlakyProvider { fail_ids: vec![] });

        let ids: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
        let id = store.submit(provider, "token".to_string(), ids, DeleteMode::Trash);
        assert!(store.cancel(&id));

        let job = wait_terminal(&store, &id).await;
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.cancelled);
        assert!(job.processed <= job.total);
    }

    #[tokio::test]
    async fn cancel_unknown_job_reports_missing() {
        let store = Arc::new(JobStore::new(&fast_config()));
        assert!(!store.cancel("job-99"));
        assert!(store.snapshot("job-99").is_none());
    }

    #[tokio::test]
    async fn eviction_drops_only_old_terminal_jobs() {
        let store = Arc::new(JobStore::new(&fast_config()));
        let provider = Arc::new(FlakyProvider { fail_ids: vec![] });

        let id = store.submit(
            provider,
            "token".to_string(),
            vec!["a".to_string()],
            DeleteMode::Trash,
        );
        wait_terminal(&store, &id).await;

        // Cutoff in the past leaves the freshly-finished job alone.
        assert_eq!(
            store.evict_finished_before(Utc::now() - chrono::Duration::hours(1)),
            0
        );
        // Cutoff in the future sweeps it.
        assert_eq!(
            store.evict_finished_before(Utc::now() + chrono::Duration::seconds(1)),
            1
        );
        assert!(store.is_empty());
    }
}
