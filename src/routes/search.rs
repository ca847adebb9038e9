//! Paged mailbox search with per-page duplicate suggestions.
//!
//! Submitting a query different from the active one resets the session's
//! page cache; follow-up requests navigate by the continuation token
//! returned with the previous page. Pages already seen are replayed from
//! the cache without touching the provider, including page zero when the
//! active query is re-submitted without a token.

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::models::PageEntry;
use crate::pages::SessionPages;
use crate::provider::MailProvider;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: u32 = 15;
const MAX_PAGE_SIZE: u32 = 100;

/// Search request payload.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Provider search query, e.g. `from:news@example.com before:2024-01-01`.
    pub query: String,
    /// Continuation token from a previously returned page.
    pub page_token: Option<String>,
    /// Items per page (defaults to 15, capped at 100).
    pub page_size: Option<u32>,
    /// Forward-compatible clustering hook; recorded but not yet applied.
    pub fuzzy_threshold: Option<f64>,
}

/// Run a search or continue paging through the active one.
#[openapi(tag = "Search")]
#[post("/search", data = "<request>")]
pub async fn search(
    user: SessionUser,
    request: Json<SearchRequest>,
    pages: &State<SessionPages>,
    provider: &State<Arc<dyn MailProvider>>,
) -> Result<Json<PageEntry>, ApiError> {
    let request = request.into_inner();
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("missing query".to_string()));
    }

    let page_size = request
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let fuzzy_threshold = request.fuzzy_threshold.unwrap_or(0.0).clamp(0.0, 1.0);

    let session = pages.session(&user.token);
    let mut session = session.lock().await;

    let index = match &request.page_token {
        None => {
            // Re-submitting the active query without a token is backward
            // navigation to page zero; anything else starts a fresh session.
            let changed = !session.is_active_query(&query)
                || session.fuzzy_threshold != fuzzy_threshold;
            if changed || session.cached_pages() == 0 {
                session.reset(query.clone(), fuzzy_threshold);
                log::debug!(
                    "new query session '{}' (fuzzyThreshold {:.2})",
                    query,
                    fuzzy_threshold
                );
            }
            0
        }
        Some(token) => {
            if !session.is_active_query(&query) {
                return Err(ApiError::BadRequest(
                    "pageToken does not belong to the active query".to_string(),
                ));
            }
            session.resolve_token(token).ok_or_else(|| {
                ApiError::BadRequest("unknown pageToken for the active query".to_string())
            })?
        }
    };

    if let Some(page) = session.get_page(index) {
        log::debug!("page {} of '{}' served from cache", index, session.query);
        let page = page.clone();
        session.current_page_index = index;
        return Ok(Json(page));
    }

    let entry = session
        .fetch_and_cache(
            index,
            request.page_token.as_deref(),
            page_size,
            provider.inner().as_ref(),
            user.access_token(),
        )
        .await?
        .clone();

    Ok(Json(entry))
}
