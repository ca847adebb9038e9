//! Per-session page cache for paginated search results.
//!
//! One `QuerySession` exists per session token and is reset whenever a new
//! query is submitted. Pages are stored under dense zero-based indices:
//! page `i` can only exist once page `i - 1` has been fetched. A page is
//! fetched from the provider at most once per session; backward navigation
//! and revisits replay the cached entry, which also keeps already-seen
//! pages stable when the upstream result set shifts underneath.

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::SessionStore;
use crate::dedupe;
use crate::models::{ItemSummary, PageEntry};
use crate::provider::{MailProvider, ProviderError};

/// Session-token keyed registry of query cursors. Each session owns its
/// cursor behind an async mutex because a cache miss holds it across
/// provider calls. Cloning is cheap and shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionPages {
    sessions: Arc<DashMap<String, Arc<Mutex<QuerySession>>>>,
}

impl SessionPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor for one session token, created empty on first use.
    pub fn session(&self, token: &str) -> Arc<Mutex<QuerySession>> {
        self.sessions
            .entry(token.to_string())
            .or_default()
            .clone()
    }

    /// Drop cursor state for sessions that no longer resolve in `store`.
    pub fn purge_dead_sessions(&self, store: &SessionStore) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|token, _| store.get(token).is_ok());
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Cursor state for one client's active search.
#[derive(Debug, Default)]
pub struct QuerySession {
    pub query: String,
    pub fuzzy_threshold: f64,
    pub current_page_index: usize,
    cache: PageCache,
}

#[derive(Debug, Default)]
pub struct PageCache {
    pages: BTreeMap<usize, PageEntry>,
    /// Continuation token of page `k` → index `k + 1` it leads to.
    token_targets: HashMap<String, usize>,
}

impl QuerySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new query: all cached pages are dropped and the cursor
    /// returns to page zero. `fuzzy_threshold` is recorded for the session
    /// but does not currently alter the clustering policy constants.
    pub fn reset(&mut self, query: impl Into<String>, fuzzy_threshold: f64) {
        self.query = query.into();
        self.fuzzy_threshold = fuzzy_threshold;
        self.current_page_index = 0;
        self.cache = PageCache::default();
    }

    /// Whether `query` matches the session's active query.
    pub fn is_active_query(&self, query: &str) -> bool {
        self.query == query
    }

    /// Cached entry for `index`, if that page was ever fetched.
    pub fn get_page(&self, index: usize) -> Option<&PageEntry> {
        self.cache.pages.get(&index)
    }

    /// Map a continuation token to the page index it opens. Tokens are only
    /// known once the page carrying them has been fetched.
    pub fn resolve_token(&self, token: &str) -> Option<usize> {
        self.cache.token_targets.get(token).copied()
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.pages.len()
    }

    /// Fetch page `index` from the provider, annotate it with duplicate
    /// suggestions and cache it. Must not be called when `get_page(index)`
    /// would hit; the route layer checks the cache first.
    pub async fn fetch_and_cache(
        &mut self,
        index: usize,
        page_token: Option<&str>,
        page_size: u32,
        provider: &dyn MailProvider,
        access_token: &str,
    ) -> Result<&PageEntry, ProviderError> {
        debug_assert!(!self.cache.pages.contains_key(&index));
        debug_assert!(index == 0 || self.cache.pages.contains_key(&(index - 1)));

        let list = provider
            .list(access_token, &self.query, page_token, page_size)
            .await?;

        let mut items = Vec::with_capacity(list.ids.len());
        for id in &list.ids {
            items.push(provider.get_metadata(access_token, id).await?);
        }

        let summaries: Vec<ItemSummary> = items.iter().map(|item| item.summary()).collect();
        let dedupe_suggestions = dedupe::cluster(&summaries);

        log::debug!(
            "cached page {} for query '{}': {} items, {} dedupe groups",
            index,
            self.query,
            items.len(),
            dedupe_suggestions.len()
        );

        if let Some(token) = &list.next_page_token {
            self.cache.token_targets.insert(token.clone(), index + 1);
        }
        let entry = PageEntry {
            items,
            next_page_token: list.next_page_token,
            dedupe_suggestions,
        };
        self.cache.pages.insert(index, entry);
        self.current_page_index = index;

        Ok(self
            .cache
            .pages
            .get(&index)
            .unwrap_or_else(|| unreachable!("page inserted above")))
    }
}
