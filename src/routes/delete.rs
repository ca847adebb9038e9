//! Synchronous bulk trash/delete.
//!
//! Runs the whole batch through the worker pool before responding. Partial
//! failure is a success response with mixed per-item statuses; callers
//! inspect individual records. `dryRun` short-circuits without a single
//! provider call.

use crate::auth::SessionUser;
use crate::config::JobConfig;
use crate::error::ApiError;
use crate::jobs::{WorkerPool, run_bulk_mutation};
use crate::models::{DeleteMode, ItemResult};
use crate::provider::MailProvider;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Bulk mutation request payload.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Message ids to mutate.
    pub ids: Vec<String>,
    /// Trash (recoverable) or permanent delete.
    pub mode: DeleteMode,
    /// When true, no mutation is issued and every id reports `dry-run`.
    #[serde(default)]
    pub dry_run: bool,
}

/// Per-item outcomes for a completed batch.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DeleteResponse {
    pub results: Vec<ItemResult>,
}

/// Apply a trash/delete mutation to each id and wait for the whole batch.
#[openapi(tag = "Messages")]
#[post("/messages/delete", data = "<request>")]
pub async fn delete_messages(
    user: SessionUser,
    request: Json<DeleteRequest>,
    config: &State<JobConfig>,
    provider: &State<Arc<dyn MailProvider>>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let request = request.into_inner();
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("no ids provided".to_string()));
    }

    if request.dry_run {
        log::info!(
            "dry-run {:?} of {} messages, no provider calls issued",
            request.mode,
            request.ids.len()
        );
        let results = request.ids.into_iter().map(ItemResult::dry_run).collect();
        return Ok(Json(DeleteResponse { results }));
    }

    log::info!(
        "synchronous {:?} of {} messages",
        request.mode,
        request.ids.len()
    );

    let pool = WorkerPool::new(config.concurrency, config.inter_op_delay);
    let results = run_bulk_mutation(
        &pool,
        Arc::clone(provider.inner()),
        user.access_token().to_string(),
        request.ids,
        request.mode,
        CancellationToken::new(),
        |_| {},
    )
    .await;

    Ok(Json(DeleteResponse { results }))
}
