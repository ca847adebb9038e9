use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

// ===== Message Models =====

/// Single RFC-822 style header as returned by the provider's metadata fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// Metadata for one remote message, as surfaced to the search response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub id: String,
    pub thread_id: Option<String>,
    pub snippet: Option<String>,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

impl ItemMetadata {
    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Reduce the metadata to the fields the dedupe clusterer compares.
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id.clone(),
            subject: self.header("Subject").unwrap_or_default().to_string(),
            sender: self.header("From").unwrap_or_default().to_string(),
        }
    }
}

/// The (id, subject, sender) triple used for duplicate clustering.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemSummary {
    pub id: String,
    pub subject: String,
    pub sender: String,
}

// ===== Dedupe Models =====

/// A cluster of likely-duplicate messages. `count == ids.len()` and is
/// always greater than one; singleton groups are never emitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DedupeGroup {
    pub subject: String,
    pub sender: String,
    pub count: usize,
    pub ids: Vec<String>,
}

// ===== Page Models =====

/// One cached page of search results, annotated with duplicate suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    pub items: Vec<ItemMetadata>,
    pub next_page_token: Option<String>,
    pub dedupe_suggestions: Vec<DedupeGroup>,
}

// ===== Bulk Operation Models =====

/// Which mutation to apply to each selected message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Move to trash (recoverable).
    Trash,
    /// Permanently delete.
    Delete,
}

/// Outcome of one item within a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    Ok,
    Error,
    DryRun,
}

/// Per-item result record. Failures are data, not exceptions: a failed
/// mutate becomes an `Error` record and the batch keeps going.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemResult {
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Ok,
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::Error,
            error: Some(message.into()),
        }
    }

    pub fn dry_run(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ItemStatus::DryRun,
            error: None,
        }
    }
}
