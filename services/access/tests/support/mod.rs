//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use access::AppConfig;
use access::AppState;
use access::notify::RecordingNotifier;
use async_trait::async_trait;
use auth::testing::{ScriptedTransport, token_for};
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::clock::{Clock, ManualClock};
use common::storage::{KeyValueStore, MemoryStore};
use nfc::{NdefRecord, NfcReader, NfcResult, NfcTag, UnavailableReader};
use serde_json::{Value, json};

pub fn test_config() -> AppConfig {
    AppConfig {
        api_base_url: "http://door.test".to_string(),
        request_timeout_secs: 5,
        storage_path: None,
        history_page_size: 2,
        cards_page_size: 20,
        history_cache_ttl_secs: 300,
        cards_cache_ttl_secs: 120,
        nfc_scan_timeout_secs: 1,
        log_level: "debug".to_string(),
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 8, 0, 0).unwrap()
}

pub struct Harness {
    pub state: AppState,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_reader(Arc::new(UnavailableReader))
    }

    pub fn with_reader(reader: Arc<dyn NfcReader>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), reader)
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>, reader: Arc<dyn NfcReader>) -> Self {
        let transport = ScriptedTransport::new();
        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::new());
        let state = AppState::build(
            test_config(),
            store.clone(),
            clock.clone(),
            transport.clone(),
            reader,
            notifier.clone(),
        );
        Self {
            state,
            transport,
            store,
            clock,
            notifier,
        }
    }

    /// Store a token for `role` valid for one hour of test time
    pub fn sign_in(&self, role: &str) {
        let token = token_for("ana", role, self.clock.now() + Duration::hours(1));
        self.state.session.store_token(&token).unwrap();
    }
}

pub fn record(id: i64, minutes_before_start: i64) -> Value {
    json!({
        "id": id,
        "cardUid": "04A21BFF",
        "cardName": "Front desk",
        "wasAuthorized": true,
        "type": "RFID",
        "timestamp": (start_time() - Duration::minutes(minutes_before_start)).to_rfc3339(),
    })
}

pub fn history_page(records: Vec<Value>, page: u32, total_pages: u32) -> Value {
    json!({
        "data": records,
        "total": total_pages * 2,
        "page": page,
        "limit": 2,
        "totalPages": total_pages,
        "hasNextPage": page < total_pages,
        "hasPrevPage": page > 1,
    })
}

pub fn card(id: i64, uid: &str, name: &str) -> Value {
    json!({
        "id": id,
        "uid": uid,
        "name": name,
        "isEnabled": true,
        "createdAt": "2025-10-30T10:00:00.000Z",
    })
}

pub fn trashed_card(id: i64, uid: &str, name: &str) -> Value {
    let mut value = card(id, uid, name);
    value["deletedAt"] = json!("2025-10-31T10:00:00.000Z");
    value
}

/// Reader that presents the same tag on every scan
pub struct StaticReader {
    pub tag: NfcTag,
}

#[async_trait]
impl NfcReader for StaticReader {
    async fn is_available(&self) -> bool {
        true
    }

    async fn start_scan(&self) -> NfcResult<()> {
        Ok(())
    }

    async fn next_tag(&self) -> NfcResult<NfcTag> {
        Ok(self.tag.clone())
    }

    async fn stop_scan(&self) -> NfcResult<()> {
        Ok(())
    }

    async fn write(&self, _records: Vec<NdefRecord>) -> NfcResult<()> {
        Ok(())
    }
}

/// Reader that never sees a tag
pub struct SilentReader;

#[async_trait]
impl NfcReader for SilentReader {
    async fn is_available(&self) -> bool {
        true
    }

    async fn start_scan(&self) -> NfcResult<()> {
        Ok(())
    }

    async fn next_tag(&self) -> NfcResult<NfcTag> {
        std::future::pending().await
    }

    async fn stop_scan(&self) -> NfcResult<()> {
        Ok(())
    }

    async fn write(&self, _records: Vec<NdefRecord>) -> NfcResult<()> {
        Ok(())
    }
}
