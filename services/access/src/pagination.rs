//! Paginated list loading with infinite-scroll accumulation
//!
//! A [`PageSource`] fetches one page at a time; a [`ListController`] keeps
//! the accumulated items, the current filter and the server's pagination
//! metadata. Refreshing or changing the filter restarts at page 1, while
//! [`ListController::load_more`] appends the next page if the server said
//! there is one.

use std::sync::Arc;

use async_trait::async_trait;
use auth::ApiResult;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::notify::{Notice, Notifier};

/// One page of results plus the server's pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    /// Everything in one page, as returned by endpoints without pagination
    pub fn single(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            limit: items.len() as u32,
            items,
            total,
            page: 1,
            total_pages: 1,
            has_next_page: false,
            has_prev_page: false,
        }
    }
}

/// List response as sent by the backend: the metadata envelope, or a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PagedResponse<T> {
    Envelope {
        data: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(rename = "totalPages", default)]
        total_pages: Option<u32>,
        #[serde(rename = "hasNextPage", default)]
        has_next_page: Option<bool>,
        #[serde(rename = "hasPrevPage", default)]
        has_prev_page: Option<bool>,
    },
    Bare(Vec<T>),
}

impl<T> PagedResponse<T> {
    /// Canonical page; metadata present in the response wins over what was requested
    pub fn into_page(self, requested_page: u32, requested_limit: u32) -> Page<T> {
        match self {
            PagedResponse::Bare(items) => Page::single(items),
            PagedResponse::Envelope {
                data,
                total,
                page,
                limit,
                total_pages,
                has_next_page,
                has_prev_page,
            } => {
                let page = page.unwrap_or(requested_page).max(1);
                let limit = limit.unwrap_or(requested_limit).max(1);
                let total = total.unwrap_or(data.len() as u64);
                let total_pages = total_pages.unwrap_or_else(|| total.div_ceil(limit as u64) as u32);
                Page {
                    items: data,
                    total,
                    page,
                    limit,
                    total_pages,
                    has_next_page: has_next_page.unwrap_or(page < total_pages),
                    has_prev_page: has_prev_page.unwrap_or(page > 1),
                }
            }
        }
    }
}

/// What to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<F> {
    pub filter: F,
    /// 1-based
    pub page: u32,
    pub limit: u32,
    /// Whether a fresh cached copy may answer an unfiltered first page
    pub prefer_cache: bool,
}

impl<F> PageRequest<F> {
    /// Whether the request may be answered from, or stored in, the local cache
    pub fn is_first_page(&self) -> bool {
        self.page == 1
    }
}

/// Fetches pages of a list
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;
    type Filter: Clone + Default + Send + Sync + 'static;

    async fn fetch_page(&self, request: &PageRequest<Self::Filter>) -> ApiResult<Page<Self::Item>>;
}

/// Observable state of a list
#[derive(Debug, Clone)]
pub struct ListState<T, F> {
    pub items: Vec<T>,
    pub filter: F,
    /// Last page successfully loaded
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub loading: bool,
    /// At least one load has completed
    pub loaded: bool,
    pub last_error: Option<String>,
    generation: u64,
}

impl<T, F: Default> ListState<T, F> {
    fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            filter: F::default(),
            page: 1,
            page_size,
            total: 0,
            total_pages: 0,
            has_next_page: false,
            has_prev_page: false,
            loading: false,
            loaded: false,
            last_error: None,
            generation: 0,
        }
    }
}

/// Controller driving one paginated list
pub struct ListController<S: PageSource> {
    source: Arc<S>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ListState<S::Item, S::Filter>>,
}

impl<S: PageSource> ListController<S> {
    pub fn new(source: Arc<S>, notifier: Arc<dyn Notifier>, page_size: u32) -> Self {
        Self {
            source,
            notifier,
            state: Mutex::new(ListState::new(page_size.max(1))),
        }
    }

    /// Load page 1 and replace the accumulated items.
    ///
    /// `refresh` bypasses the cache. A load started while another is in
    /// flight supersedes it; the older response is discarded when it lands.
    pub async fn load(&self, refresh: bool) -> ApiResult<()> {
        let (request, generation) = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.loading = true;
            (
                PageRequest {
                    filter: state.filter.clone(),
                    page: 1,
                    limit: state.page_size,
                    prefer_cache: !refresh,
                },
                state.generation,
            )
        };

        let result = self.source.fetch_page(&request).await;
        self.apply(generation, result, false).await
    }

    /// Append the next page.
    ///
    /// Returns `Ok(false)` without fetching when a load is in flight or the
    /// server reported no further pages.
    pub async fn load_more(&self) -> ApiResult<bool> {
        let (request, generation) = {
            let mut state = self.state.lock().await;
            if state.loading || !state.has_next_page {
                debug!(
                    "Skipping load_more (loading: {}, has_next_page: {})",
                    state.loading, state.has_next_page
                );
                return Ok(false);
            }
            state.loading = true;
            (
                PageRequest {
                    filter: state.filter.clone(),
                    page: state.page + 1,
                    limit: state.page_size,
                    prefer_cache: false,
                },
                state.generation,
            )
        };

        let result = self.source.fetch_page(&request).await;
        self.apply(generation, result, true).await?;
        Ok(true)
    }

    /// Replace the filter and reload from page 1
    pub async fn set_filter(&self, filter: S::Filter) -> ApiResult<()> {
        {
            let mut state = self.state.lock().await;
            state.filter = filter;
            state.page = 1;
        }
        self.load(false).await
    }

    /// Pull-to-refresh
    pub async fn refresh(&self) -> ApiResult<()> {
        self.load(true).await
    }

    pub async fn snapshot(&self) -> ListState<S::Item, S::Filter> {
        self.state.lock().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    async fn apply(
        &self,
        generation: u64,
        result: ApiResult<Page<S::Item>>,
        append: bool,
    ) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!("Discarding response superseded by a newer load");
            return Ok(());
        }
        state.loading = false;

        match result {
            Ok(page) => {
                if append {
                    state.items.extend(page.items);
                } else {
                    state.items = page.items;
                }
                state.page = page.page;
                state.total = page.total;
                state.total_pages = page.total_pages;
                state.has_next_page = page.has_next_page;
                state.has_prev_page = page.has_prev_page;
                state.loaded = true;
                state.last_error = None;
                info!(
                    "Loaded page {}/{} ({} items held)",
                    state.page,
                    state.total_pages,
                    state.items.len()
                );
                Ok(())
            }
            Err(err) => {
                let message = err.user_message();
                warn!("List load failed: {}", err);
                state.last_error = Some(message.clone());
                drop(state);
                self.notifier.notify(Notice::danger(message));
                Err(err)
            }
        }
    }
}
