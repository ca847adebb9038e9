//! Background delete jobs: submission, polling and cancellation.
//!
//! Submission returns the job id immediately; the client observes progress
//! by polling the status endpoint. Cancellation is advisory and takes
//! effect at the workers' next queue-pop boundary.

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::jobs::{Job, JobStore};
use crate::models::DeleteMode;
use crate::provider::MailProvider;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for starting a background delete job.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Message ids to mutate.
    pub ids: Vec<String>,
    /// Trash (recoverable) or permanent delete.
    pub mode: DeleteMode,
}

/// Response returned when a job has been accepted.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmitResponse {
    /// Identifier to poll for progress.
    pub job_id: String,
}

/// Simple message wrapper for acknowledgement responses.
#[derive(Debug, Serialize, JsonSchema)]
pub struct MessageResponse {
    /// Response text.
    pub message: String,
}

/// Start a background delete job and return its id without waiting.
#[openapi(tag = "Jobs")]
#[post("/messages/delete-job", data = "<request>")]
pub async fn submit_delete_job(
    user: SessionUser,
    request: Json<JobRequest>,
    store: &State<Arc<JobStore>>,
    provider: &State<Arc<dyn MailProvider>>,
) -> Result<Json<JobSubmitResponse>, ApiError> {
    let request = request.into_inner();
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("no ids provided".to_string()));
    }

    let job_id = store.submit(
        Arc::clone(provider.inner()),
        user.access_token().to_string(),
        request.ids,
        request.mode,
    );

    Ok(Json(JobSubmitResponse { job_id }))
}

/// Poll one job's current snapshot.
#[openapi(tag = "Jobs")]
#[get("/jobs/<job_id>")]
pub async fn get_job(
    _user: SessionUser,
    job_id: &str,
    store: &State<Arc<JobStore>>,
) -> Result<Json<Job>, ApiError> {
    store
        .snapshot(job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job '{job_id}' not found")))
}

/// Request cooperative cancellation of a job.
#[openapi(tag = "Jobs")]
#[post("/jobs/<job_id>/cancel")]
pub async fn cancel_job(
    _user: SessionUser,
    job_id: &str,
    store: &State<Arc<JobStore>>,
) -> Result<Json<MessageResponse>, ApiError> {
    if store.cancel(job_id) {
        Ok(Json(MessageResponse {
            message: format!("Cancellation requested for job '{job_id}'"),
        }))
    } else {
        Err(ApiError::NotFound(format!("job '{job_id}' not found")))
    }
}
