//! Access history and remote open

use async_trait::async_trait;
use auth::{ApiResult, Gateway};
use chrono::{DateTime, SecondsFormat, Utc};
use common::cache::LocalCache;
use common::storage::ACCESS_RECORDS_CACHE_KEY;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::{AccessMethod, AccessRecord, OpenDoorResponse};
use crate::pagination::{ListController, Page, PageRequest, PageSource, PagedResponse};

/// Structured filters for the history list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub method: Option<AccessMethod>,
    pub search: Option<String>,
}

impl HistoryFilter {
    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// No filter is set; blank searches count as absent
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.method.is_none()
            && self.search_term().is_none()
    }

    /// Query string for `GET /access/history`
    pub fn to_query(&self, page: u32, limit: u32) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(start) = self.start_date {
            query.push((
                "startDate".to_string(),
                start.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(end) = self.end_date {
            query.push((
                "endDate".to_string(),
                end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(method) = self.method {
            query.push(("type".to_string(), method.as_str().to_string()));
        }
        if let Some(term) = self.search_term() {
            query.push(("search".to_string(), term.to_string()));
        }
        query.push(("page".to_string(), page.to_string()));
        query.push(("limit".to_string(), limit.to_string()));
        query
    }
}

/// Client for the access endpoints
#[derive(Clone)]
pub struct AccessService {
    gateway: Gateway,
    cache: LocalCache,
}

impl AccessService {
    pub fn new(gateway: Gateway, cache: LocalCache) -> Self {
        Self { gateway, cache }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Fetch one page of history, newest first.
    ///
    /// Unfiltered first pages go through the cache: served from it when
    /// `prefer_cache` is set and the entry is fresh, written back after a
    /// network read, and used as a fallback when the server is unreachable.
    pub async fn history(&self, request: &PageRequest<HistoryFilter>) -> ApiResult<Page<AccessRecord>> {
        let cacheable = request.is_first_page() && request.filter.is_empty();

        if cacheable && request.prefer_cache {
            if let Some(page) = self.cached() {
                debug!("Serving access history from cache");
                return Ok(page);
            }
        }

        let query = request.filter.to_query(request.page, request.limit);
        let response = self
            .gateway
            .get::<PagedResponse<AccessRecord>>("/access/history", query)
            .await;

        match response {
            Ok(response) => {
                let mut page = response.into_page(request.page, request.limit);
                page.items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                if cacheable {
                    if let Err(e) = self.cache.set(ACCESS_RECORDS_CACHE_KEY, &page) {
                        warn!("Failed to cache access history: {}", e);
                    }
                }
                Ok(page)
            }
            Err(err) if err.is_unreachable() && cacheable => match self.cached() {
                Some(page) => {
                    warn!("Server unreachable; showing cached access history");
                    Ok(page)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Ask the backend to trigger the door relay
    pub async fn open_door(&self) -> ApiResult<OpenDoorResponse> {
        info!("Requesting remote door open");
        let response: Option<OpenDoorResponse> = self.gateway.post("/access/open", &json!({})).await?;

        // The new REMOTE record makes the cached history stale
        if let Err(e) = self.cache.invalidate(ACCESS_RECORDS_CACHE_KEY) {
            warn!("Failed to invalidate access history cache: {}", e);
        }
        Ok(response.unwrap_or_default())
    }

    fn cached(&self) -> Option<Page<AccessRecord>> {
        match self.cache.get(ACCESS_RECORDS_CACHE_KEY) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to read access history cache: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PageSource for AccessService {
    type Item = AccessRecord;
    type Filter = HistoryFilter;

    async fn fetch_page(&self, request: &PageRequest<HistoryFilter>) -> ApiResult<Page<AccessRecord>> {
        self.history(request).await
    }
}

/// Infinite-scroll controller for the history screen
pub type HistoryController = ListController<AccessService>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_carries_every_filter() {
        let filter = HistoryFilter {
            start_date: Some(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2025, 11, 1, 23, 59, 59).unwrap()),
            method: Some(AccessMethod::Remote),
            search: Some("  lobby ".to_string()),
        };
        let query = filter.to_query(3, 20);

        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("startDate"), Some("2025-11-01T00:00:00.000Z"));
        assert_eq!(get("endDate"), Some("2025-11-01T23:59:59.000Z"));
        assert_eq!(get("type"), Some("REMOTE"));
        assert_eq!(get("search"), Some("lobby"));
        assert_eq!(get("page"), Some("3"));
        assert_eq!(get("limit"), Some("20"));
    }

    #[test]
    fn test_blank_search_is_no_filter() {
        let filter = HistoryFilter {
            search: Some("   ".to_string()),
            ..HistoryFilter::default()
        };
        assert!(filter.is_empty());
        assert!(!filter.to_query(1, 20).iter().any(|(k, _)| k == "search"));

        let filter = HistoryFilter {
            method: Some(AccessMethod::Rfid),
            ..HistoryFilter::default()
        };
        assert!(!filter.is_empty());
    }
}
