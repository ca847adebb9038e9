//! Gmail REST implementation of [`MailProvider`].
//!
//! Wraps the `users/me/messages` surface: `list` with a search query and
//! continuation token, metadata-only `get` restricted to the Subject/From/
//! Date headers, `trash` for the recoverable mode and permanent `delete`.
//! The base URL is configurable so tests can point the client at a stub.

use super::{ListPage, MailProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::models::{DeleteMode, ItemMetadata, MessageHeader};
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

const METADATA_HEADERS: [&str; 3] = ["Subject", "From", "Date"];

#[derive(Debug, Clone)]
pub struct GmailProvider {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
    snippet: Option<String>,
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<PayloadHeader>,
}

#[derive(Debug, Deserialize)]
struct PayloadHeader {
    name: String,
    value: String,
}

impl GmailProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url)
    }

    /// Map non-2xx statuses into the provider error taxonomy. `id` is set
    /// for per-message calls so 404 can name the missing message.
    async fn check_status(response: Response, id: Option<&str>) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthExpired);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(ProviderError::MessageNotFound(id.to_string()));
            }
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[rocket::async_trait]
impl MailProvider for GmailProvider {
    async fn list(
        &self,
        access_token: &str,
        query: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<ListPage, ProviderError> {
        let mut request = self
            .http
            .get(self.messages_url())
            .bearer_auth(access_token)
            .query(&[("q", query)])
            .query(&[("maxResults", page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = Self::check_status(request.send().await?, None).await?;
        let body: ListResponse = response.json().await?;

        debug!(
            "gmail list returned {} ids (more: {})",
            body.messages.len(),
            body.next_page_token.is_some()
        );

        Ok(ListPage {
            ids: body.messages.into_iter().map(|m| m.id).collect(),
            next_page_token: body.next_page_token,
        })
    }

    async fn get_metadata(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<ItemMetadata, ProviderError> {
        let mut request = self
            .http
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(access_token)
            .query(&[("format", "metadata")]);
        for header in METADATA_HEADERS {
            request = request.query(&[("metadataHeaders", header)]);
        }

        let response = Self::check_status(request.send().await?, Some(id)).await?;
        let body: MessageResponse = response.json().await?;

        Ok(ItemMetadata {
            id: body.id,
            thread_id: body.thread_id,
            snippet: body.snippet,
            headers: body
                .payload
                .map(|p| p.headers)
                .unwrap_or_default()
                .into_iter()
                .map(|h| MessageHeader {
                    name: h.name,
                    value: h.value,
                })
                .collect(),
        })
    }

    async fn mutate(
        &self,
        access_token: &str,
        id: &str,
        mode: DeleteMode,
    ) -> Result<(), ProviderError> {
        let request = match mode {
            DeleteMode::Trash => self
                .http
                .post(format!("{}/{}/trash", self.messages_url(), id)),
            DeleteMode::Delete => self.http.delete(format!("{}/{}", self.messages_url(), id)),
        };

        Self::check_status(request.bearer_auth(access_token).send().await?, Some(id)).await?;
        Ok(())
    }
}
