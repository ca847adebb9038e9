//! Remote mail provider boundary.
//!
//! The rest of the crate treats the provider as an opaque service exposing
//! list/get/mutate; `GmailProvider` is the production implementation and
//! tests substitute their own. Credentials travel per call because sessions
//! outlive any one provider instance.

pub mod gmail;

pub use gmail::GmailProvider;

use crate::models::{DeleteMode, ItemMetadata};
use thiserror::Error;

/// One page of a list call: message references plus the continuation token
/// for the page after it, if any.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected credentials")]
    AuthExpired,
    #[error("message {0} not found")]
    MessageNotFound(String),
    #[error("provider returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Opaque remote mail service. `access_token` is the provider credential
/// held by the caller's session.
#[rocket::async_trait]
pub trait MailProvider: Send + Sync {
    /// List message ids matching `query`, one page at a time.
    async fn list(
        &self,
        access_token: &str,
        query: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<ListPage, ProviderError>;

    /// Fetch the metadata headers for one message.
    async fn get_metadata(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<ItemMetadata, ProviderError>;

    /// Apply a trash/delete mutation to one message.
    async fn mutate(
        &self,
        access_token: &str,
        id: &str,
        mode: DeleteMode,
    ) -> Result<(), ProviderError>;
}
