//! Card registry: active and trashed lists, mutations and the trash workflow

use std::sync::Arc;

use async_trait::async_trait;
use auth::models::Action;
use auth::{ApiError, ApiResult, Gateway};
use common::cache::LocalCache;
use common::storage::CARDS_CACHE_KEY;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::enrollment::{validate_card_name, validate_uid};
use crate::models::{Card, CardEnvelope, CreateCardRequest, MessageResponse, UpdateCardRequest};
use crate::notify::{Notice, Notifier};
use crate::pagination::{ListController, Page, PageRequest, PageSource, PagedResponse};

/// Which partition of the registry is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardView {
    #[default]
    Active,
    Trash,
}

impl CardView {
    fn path(self) -> &'static str {
        match self {
            CardView::Active => "/cards",
            CardView::Trash => "/cards/deleted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFilter {
    pub search: Option<String>,
}

impl CardFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }

    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
    }
}

/// Client for the card endpoints
#[derive(Clone)]
pub struct CardService {
    gateway: Gateway,
    cache: LocalCache,
}

impl CardService {
    pub fn new(gateway: Gateway, cache: LocalCache) -> Self {
        Self { gateway, cache }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Fetch one page of a partition.
    ///
    /// Only the unfiltered first page of active cards is cached. Searches
    /// against endpoints that answer with a bare array are filtered locally.
    pub async fn list(&self, view: CardView, request: &PageRequest<CardFilter>) -> ApiResult<Page<Card>> {
        let cacheable = view == CardView::Active && request.is_first_page() && request.filter.is_empty();

        if cacheable && request.prefer_cache {
            if let Some(page) = self.cached() {
                debug!("Serving cards from cache");
                return Ok(page);
            }
        }

        let mut query = Vec::new();
        if let Some(term) = request.filter.search_term() {
            query.push(("search".to_string(), term.to_string()));
        }
        query.push(("page".to_string(), request.page.to_string()));
        query.push(("limit".to_string(), request.limit.to_string()));

        let response = self
            .gateway
            .get::<PagedResponse<Card>>(view.path(), query)
            .await;

        match response {
            Ok(PagedResponse::Bare(cards)) => {
                let cards = match request.filter.search_term() {
                    Some(term) => cards.into_iter().filter(|card| card.matches(term)).collect(),
                    None => cards,
                };
                let page = Page::single(cards);
                if cacheable {
                    self.store(&page);
                }
                Ok(page)
            }
            Ok(envelope) => {
                let page = envelope.into_page(request.page, request.limit);
                if cacheable {
                    self.store(&page);
                }
                Ok(page)
            }
            Err(err) if err.is_unreachable() && cacheable => match self.cached() {
                Some(page) => {
                    warn!("Server unreachable; showing cached cards");
                    Ok(page)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    pub async fn list_active(&self, request: &PageRequest<CardFilter>) -> ApiResult<Page<Card>> {
        self.list(CardView::Active, request).await
    }

    pub async fn list_deleted(&self, request: &PageRequest<CardFilter>) -> ApiResult<Page<Card>> {
        self.list(CardView::Trash, request).await
    }

    /// Register a new card (administrators only)
    pub async fn create(&self, uid: &str, name: &str) -> ApiResult<Card> {
        self.session_require(Action::CreateCard)?;
        let request = CreateCardRequest {
            uid: validate_uid(uid).map_err(ApiError::InvalidInput)?,
            name: validate_card_name(name).map_err(ApiError::InvalidInput)?,
        };

        info!("Creating card {}", request.uid);
        let created: CardEnvelope = self.gateway.post("/cards", &request).await?;
        self.invalidate();
        Ok(created.into_card())
    }

    /// Change a card's UID, name or enabled flag (administrators only)
    pub async fn update(&self, id: i64, changes: &UpdateCardRequest) -> ApiResult<Card> {
        self.session_require(Action::UpdateCard)?;
        let mut changes = changes.clone();
        if let Some(uid) = changes.uid.as_deref() {
            changes.uid = Some(validate_uid(uid).map_err(ApiError::InvalidInput)?);
        }
        if let Some(name) = changes.name.as_deref() {
            changes.name = Some(validate_card_name(name).map_err(ApiError::InvalidInput)?);
        }

        info!("Updating card {}", id);
        let updated: CardEnvelope = self.gateway.put(&format!("/cards/{}", id), &changes).await?;
        self.invalidate();
        Ok(updated.into_card())
    }

    /// Move a card to the trash (administrators only)
    pub async fn soft_delete(&self, id: i64) -> ApiResult<()> {
        self.session_require(Action::DeleteCard)?;
        info!("Moving card {} to trash", id);
        let response: Option<MessageResponse> = self.gateway.delete(&format!("/cards/{}", id)).await?;
        self.acknowledge(response);
        Ok(())
    }

    /// Bring a trashed card back (administrators only)
    pub async fn restore(&self, id: i64) -> ApiResult<()> {
        self.session_require(Action::RestoreCard)?;
        info!("Restoring card {}", id);
        let response: Option<MessageResponse> = self
            .gateway
            .patch(&format!("/cards/{}/restore", id), &json!({}))
            .await?;
        self.acknowledge(response);
        Ok(())
    }

    /// Delete a card for good (administrators only)
    pub async fn purge(&self, id: i64) -> ApiResult<()> {
        self.session_require(Action::PurgeCard)?;
        warn!("Permanently deleting card {}", id);
        let response: Option<MessageResponse> = self
            .gateway
            .delete(&format!("/cards/{}/permanent", id))
            .await?;
        self.acknowledge(response);
        Ok(())
    }

    /// Whether an active card already carries `uid`, ignoring case
    pub async fn is_uid_registered(&self, uid: &str) -> ApiResult<bool> {
        let uid = uid.trim();
        let mut request = PageRequest {
            filter: CardFilter::search(uid),
            page: 1,
            limit: 100,
            prefer_cache: false,
        };

        loop {
            let page = self.list_active(&request).await?;
            if page
                .items
                .iter()
                .any(|card| !card.is_deleted() && card.uid.eq_ignore_ascii_case(uid))
            {
                return Ok(true);
            }
            // Walk by what was asked, not the page number echoed back
            if !page.has_next_page || request.page >= page.total_pages {
                return Ok(false);
            }
            request.page += 1;
        }
    }

    fn session_require(&self, action: Action) -> ApiResult<()> {
        self.gateway.session().require(action)
    }

    fn acknowledge(&self, response: Option<MessageResponse>) {
        if let Some(message) = response.and_then(|r| r.message) {
            debug!("Server: {}", message);
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        if let Err(e) = self.cache.invalidate(CARDS_CACHE_KEY) {
            warn!("Failed to invalidate card cache: {}", e);
        }
    }

    fn store(&self, page: &Page<Card>) {
        if let Err(e) = self.cache.set(CARDS_CACHE_KEY, page) {
            warn!("Failed to cache cards: {}", e);
        }
    }

    fn cached(&self) -> Option<Page<Card>> {
        match self.cache.get(CARDS_CACHE_KEY) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to read card cache: {}", e);
                None
            }
        }
    }
}

/// Message shown when creating a card fails
pub fn create_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Conflict(_) => "This card is already registered".to_string(),
        ApiError::Validation(_) => "Invalid card data".to_string(),
        _ => err.user_message(),
    }
}

/// One partition of the registry as a page source
pub struct CardSource {
    service: CardService,
    view: CardView,
}

impl CardSource {
    pub fn new(service: CardService, view: CardView) -> Self {
        Self { service, view }
    }
}

#[async_trait]
impl PageSource for CardSource {
    type Item = Card;
    type Filter = CardFilter;

    async fn fetch_page(&self, request: &PageRequest<CardFilter>) -> ApiResult<Page<Card>> {
        self.service.list(self.view, request).await
    }
}

/// Cards screen: independent active and trash lists behind a view toggle
pub struct CardsController {
    service: CardService,
    notifier: Arc<dyn Notifier>,
    active: ListController<CardSource>,
    trash: ListController<CardSource>,
    view: Mutex<CardView>,
}

impl CardsController {
    pub fn new(service: CardService, notifier: Arc<dyn Notifier>, page_size: u32) -> Self {
        let active = ListController::new(
            Arc::new(CardSource::new(service.clone(), CardView::Active)),
            notifier.clone(),
            page_size,
        );
        let trash = ListController::new(
            Arc::new(CardSource::new(service.clone(), CardView::Trash)),
            notifier.clone(),
            page_size,
        );
        Self {
            service,
            notifier,
            active,
            trash,
            view: Mutex::new(CardView::Active),
        }
    }

    pub fn list(&self, view: CardView) -> &ListController<CardSource> {
        match view {
            CardView::Active => &self.active,
            CardView::Trash => &self.trash,
        }
    }

    pub async fn view(&self) -> CardView {
        *self.view.lock().await
    }

    /// List for the partition currently shown
    pub async fn current(&self) -> &ListController<CardSource> {
        self.list(self.view().await)
    }

    /// Show another partition, loading it the first time it is shown
    pub async fn switch_view(&self, view: CardView) -> ApiResult<()> {
        *self.view.lock().await = view;
        let list = self.list(view);
        if !list.is_loaded().await {
            list.load(false).await?;
        }
        Ok(())
    }

    pub async fn soft_delete(&self, id: i64) -> ApiResult<()> {
        self.mutate(self.service.soft_delete(id), "Card moved to trash")
            .await?;
        self.reload(CardView::Active).await;
        self.reload(CardView::Trash).await;
        Ok(())
    }

    pub async fn restore(&self, id: i64) -> ApiResult<()> {
        self.mutate(self.service.restore(id), "Card restored").await?;
        self.reload(CardView::Trash).await;
        self.reload(CardView::Active).await;
        Ok(())
    }

    pub async fn purge(&self, id: i64) -> ApiResult<()> {
        self.mutate(self.service.purge(id), "Card permanently deleted")
            .await?;
        self.reload(CardView::Trash).await;
        Ok(())
    }

    async fn mutate(
        &self,
        operation: impl std::future::Future<Output = ApiResult<()>>,
        success: &str,
    ) -> ApiResult<()> {
        match operation.await {
            Ok(()) => {
                self.notifier.notify(Notice::success(success));
                Ok(())
            }
            Err(err) => {
                self.notifier.notify(Notice::danger(err.user_message()));
                Err(err)
            }
        }
    }

    /// Refresh a partition that has already been shown; load failures are notified by the list
    async fn reload(&self, view: CardView) {
        let list = self.list(view);
        if list.is_loaded().await {
            if let Err(e) = list.refresh().await {
                debug!("Reload of {:?} cards failed: {}", view, e);
            }
        }
    }
}
