//! Query synchronization engine.
//!
//! Reconciles user input into [`QueryState`], triggers refetches, and keeps
//! the rendered view consistent with the state that produced it. Responses
//! may complete out of order; correctness comes from the stale-response
//! suppression rule, not from response ordering.

use super::pagination::{page_items, total_pages, PageItem};
use super::state::{FilterField, QueryState, SortDirection, SortField};
use crate::config::QueryConfig;
use crate::error::Result;
use crate::models::{Book, BookList};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Executor of list queries. Implemented by the books API client; tests use
/// scripted fakes.
#[async_trait]
pub trait ListQuery: Send + Sync {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookList>;
}

/// Render status of the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing fetched yet.
    Loading,
    /// Data present.
    Ready,
    /// Backend unreachable; an inline offline message replaces the list.
    Offline,
    /// Irrecoverable fetch error; rendered inline in the content area.
    Error(String),
}

/// Presentation model for the book list: a pure function of the query state
/// and the fetched data. Carries no UI bindings.
#[derive(Debug, Clone)]
pub struct ListView {
    pub status: ViewStatus,
    /// The query this view reflects.
    pub query: QueryState,
    pub books: Vec<Book>,
    pub total: u64,
    /// Pagination control; empty when there is at most one page.
    pub pages: Vec<PageItem>,
}

impl ListView {
    pub fn loading(query: QueryState) -> Self {
        Self {
            status: ViewStatus::Loading,
            query,
            books: Vec::new(),
            total: 0,
            pages: Vec::new(),
        }
    }

    pub fn ready(query: QueryState, list: BookList) -> Self {
        let pages = page_items(query.page, total_pages(list.total, query.per_page));
        Self {
            status: ViewStatus::Ready,
            query,
            books: list.items,
            total: list.total,
            pages,
        }
    }

    pub fn offline(query: QueryState) -> Self {
        Self {
            status: ViewStatus::Offline,
            query,
            books: Vec::new(),
            total: 0,
            pages: Vec::new(),
        }
    }

    pub fn failed(query: QueryState, detail: String) -> Self {
        Self {
            status: ViewStatus::Error(detail),
            query,
            books: Vec::new(),
            total: 0,
            pages: Vec::new(),
        }
    }
}

struct SyncInner {
    /// Canonical query state. Mutated only through `QuerySync` methods.
    state: RwLock<QueryState>,
    executor: Arc<dyn ListQuery>,
    view_tx: watch::Sender<ListView>,
    debounce: Duration,
    /// Pending debounced search refetch; a new keystroke aborts and
    /// restarts it, so only the most recent quiet period wins.
    search_timer: Mutex<Option<JoinHandle<()>>>,
    /// Explicit per-field direction choices made this session.
    sort_overrides: Mutex<HashMap<SortField, SortDirection>>,
}

impl SyncInner {
    /// Fetch `query` and publish the result, unless the state moved on
    /// while the request was in flight. `query` is the snapshot taken when
    /// the request was issued; its serialization is the suppression key.
    async fn fetch_and_publish(self: Arc<Self>, query: QueryState) {
        let key = query.to_query_string();

        let outcome = self.executor.fetch_page(&query).await;

        let current_key = self
            .state
            .read()
            .expect("query lock poisoned")
            .to_query_string();
        if current_key != key {
            // A newer request is in flight or already applied.
            debug!("Dropping stale list response for {}", key);
            return;
        }

        let view = match outcome {
            Ok(list) => ListView::ready(query, list),
            Err(e) if e.is_offline() => ListView::offline(query),
            Err(e) => ListView::failed(query, e.user_message()),
        };
        // send_replace keeps the value for subscribers that arrive later
        self.view_tx.send_replace(view);
    }

    fn spawn_fetch(self: &Arc<Self>) {
        self.abort_pending_search();
        let query = self.state.read().expect("query lock poisoned").clone();
        let inner = self.clone();
        tokio::spawn(inner.fetch_and_publish(query));
    }

    fn abort_pending_search(&self) {
        if let Some(handle) = self
            .search_timer
            .lock()
            .expect("timer lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

/// Single mutation entry point for [`QueryState`].
///
/// Every mutation returns the new serialized query and initiates a refetch:
/// debounced for search text, immediate for everything else. Renderers
/// subscribe to the published [`ListView`] and never touch the state
/// directly.
#[derive(Clone)]
pub struct QuerySync {
    inner: Arc<SyncInner>,
}

impl QuerySync {
    pub fn new(executor: Arc<dyn ListQuery>) -> Self {
        Self::with_debounce(executor, QueryConfig::SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(executor: Arc<dyn ListQuery>, debounce: Duration) -> Self {
        let state = QueryState::default();
        let (view_tx, _) = watch::channel(ListView::loading(state.clone()));
        Self {
            inner: Arc::new(SyncInner {
                state: RwLock::new(state),
                executor,
                view_tx,
                debounce,
                search_timer: Mutex::new(None),
                sort_overrides: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to view updates.
    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.inner.view_tx.subscribe()
    }

    /// Read-only snapshot of the current state.
    pub fn snapshot(&self) -> QueryState {
        self.inner.state.read().expect("query lock poisoned").clone()
    }

    /// Fetch the current state immediately (startup, pull-to-refresh).
    pub fn refresh(&self) -> String {
        let key = self.snapshot().to_query_string();
        self.inner.spawn_fetch();
        key
    }

    /// Update the search text. The refetch is debounced: rapid keystrokes
    /// coalesce into one request carrying the last value.
    pub fn update_search(&self, text: impl Into<String>) -> String {
        let key = {
            let mut state = self.inner.state.write().expect("query lock poisoned");
            state.search = text.into();
            state.page = 1;
            state.to_query_string()
        };

        let mut timer = self
            .inner
            .search_timer
            .lock()
            .expect("timer lock poisoned");
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        let inner = self.inner.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            // Serialize at fire time: only the most recent quiet period wins.
            let query = inner.state.read().expect("query lock poisoned").clone();
            inner.clone().fetch_and_publish(query).await;
        }));

        key
    }

    /// Set or clear a filter. Resets to the first page and refetches
    /// immediately.
    pub fn update_filter(&self, field: FilterField, value: Option<String>) -> String {
        let key = {
            let mut state = self.inner.state.write().expect("query lock poisoned");
            state.set_filter(field, value);
            state.page = 1;
            state.to_query_string()
        };
        self.inner.spawn_fetch();
        key
    }

    /// Change the sort field. Direction falls back to the field's default
    /// unless the user explicitly chose one for it this session. Resets to
    /// the first page and refetches immediately.
    pub fn change_sort(&self, field: SortField) -> String {
        let direction = self
            .inner
            .sort_overrides
            .lock()
            .expect("overrides lock poisoned")
            .get(&field)
            .copied()
            .unwrap_or_else(|| field.default_direction());

        let key = {
            let mut state = self.inner.state.write().expect("query lock poisoned");
            state.sort_field = field;
            state.sort_direction = direction;
            state.page = 1;
            state.to_query_string()
        };
        self.inner.spawn_fetch();
        key
    }

    /// Explicitly set the sort direction for the current field, remembering
    /// the choice for the rest of the session.
    pub fn set_sort_direction(&self, direction: SortDirection) -> String {
        let key = {
            let mut state = self.inner.state.write().expect("query lock poisoned");
            state.sort_direction = direction;
            state.page = 1;
            self.inner
                .sort_overrides
                .lock()
                .expect("overrides lock poisoned")
                .insert(state.sort_field, direction);
            state.to_query_string()
        };
        self.inner.spawn_fetch();
        key
    }

    /// Jump to a page. Leaves every other field untouched and refetches
    /// immediately.
    pub fn goto_page(&self, page: u32) -> String {
        let key = {
            let mut state = self.inner.state.write().expect("query lock poisoned");
            state.page = page.max(1);
            state.to_query_string()
        };
        self.inner.spawn_fetch();
        key
    }
}
