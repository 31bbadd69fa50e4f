//! Session, history and door flows against a scripted backend

mod support;

use std::sync::Arc;

use access::door::{Confirm, DoorError, DoorOutcome, door_error_message};
use access::models::AccessMethod;
use access::notify::NoticeLevel;
use access::{AppState, HistoryFilter};
use async_trait::async_trait;
use auth::ApiError;
use auth::http::Method;
use auth::models::LoginCredentials;
use auth::testing::token_for;
use chrono::Duration;
use common::clock::Clock;
use common::error::{StorageError, StorageResult};
use common::storage::{APP_SETTINGS_KEY, DOOR_STATS_KEY, FileStore, KeyValueStore, MemoryStore};
use nfc::UnavailableReader;
use serde_json::json;
use support::{Harness, history_page, record};

struct Answer(bool);

#[async_trait]
impl Confirm for Answer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[tokio::test]
async fn test_login_then_401_ends_session() {
    let harness = Harness::new();
    let token = token_for("ana", "user", harness.clock.now() + Duration::hours(1));
    let mut signal = harness.state.session.subscribe();

    harness.transport.push_json(201, json!({ "access_token": token }));
    harness
        .state
        .auth
        .login(&LoginCredentials::new("ana", "secret"))
        .await
        .unwrap();

    assert!(harness.state.session.is_authenticated());
    assert!(*signal.borrow_and_update());
    assert_eq!(harness.state.session.username().as_deref(), Some("ana"));
    assert!(!harness.state.session.is_admin());

    harness
        .transport
        .push_json(401, json!({ "statusCode": 401, "message": "Unauthorized" }));
    let controller = harness.state.history_controller();
    let err = controller.load(false).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!harness.state.session.is_authenticated());
    assert_eq!(harness.state.session.token().unwrap(), None);
    assert!(!*signal.borrow_and_update());
    assert!(harness.state.require_session().is_err());

    let notice = harness.notifier.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Danger);
    assert!(notice.message.contains("Session expired"));
}

#[tokio::test]
async fn test_expired_token_is_not_a_session() {
    let harness = Harness::new();
    harness.sign_in("admin");
    assert!(harness.state.session.is_authenticated());

    harness.clock.advance(Duration::hours(2));
    assert!(!harness.state.session.is_authenticated());
}

#[tokio::test]
async fn test_refresh_replaces_accumulated_records() {
    let harness = Harness::new();
    harness.sign_in("user");
    let transport = &harness.transport;

    transport.push_json(200, history_page(vec![record(1, 1), record(2, 2)], 1, 2));
    transport.push_json(200, history_page(vec![record(3, 3), record(4, 4)], 2, 2));
    transport.push_json(200, history_page(vec![record(9, 0)], 1, 1));

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();
    assert!(controller.load_more().await.unwrap());
    assert_eq!(controller.snapshot().await.items.len(), 4);

    controller.refresh().await.unwrap();
    let state = controller.snapshot().await;
    let ids: Vec<i64> = state.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![9]);
    assert_eq!(state.page, 1);
    assert!(!state.has_next_page);

    let requests = transport.requests();
    assert_eq!(requests[1].query_param("page"), Some("2"));
    assert_eq!(requests[1].query_param("limit"), Some("2"));
    assert_eq!(requests[2].query_param("page"), Some("1"));
}

#[tokio::test]
async fn test_load_more_on_last_page_sends_nothing() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1)], 1, 1));

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();

    assert!(!controller.load_more().await.unwrap());
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(controller.snapshot().await.page, 1);
}

#[tokio::test]
async fn test_records_sorted_newest_first() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 30), record(2, 5)], 1, 1));

    let page = harness
        .state
        .access
        .history(&access::PageRequest {
            filter: HistoryFilter::default(),
            page: 1,
            limit: 2,
            prefer_cache: false,
        })
        .await
        .unwrap();
    assert_eq!(page.items[0].id, 2);
    assert_eq!(page.items[1].id, 1);
}

#[tokio::test]
async fn test_unfiltered_first_page_served_from_cache() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1)], 1, 1));

    harness.state.history_controller().load(false).await.unwrap();

    harness.clock.advance(Duration::minutes(4));
    let second = harness.state.history_controller();
    second.load(false).await.unwrap();
    assert_eq!(second.snapshot().await.items.len(), 1);
    assert_eq!(harness.transport.request_count(), 1);

    // Past the five minute lifetime the network is used again
    harness.clock.advance(Duration::minutes(2));
    harness
        .transport
        .push_json(200, history_page(vec![record(5, 0)], 1, 1));
    let third = harness.state.history_controller();
    third.load(false).await.unwrap();
    assert_eq!(third.snapshot().await.items[0].id, 5);
    assert_eq!(harness.transport.request_count(), 2);
}

#[tokio::test]
async fn test_unreachable_falls_back_to_cached_history() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1), record(2, 2)], 1, 1));

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();

    harness.clock.advance(Duration::minutes(1));
    harness.transport.push_unreachable();
    controller.refresh().await.unwrap();

    let state = controller.snapshot().await;
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.last_error, None);
    assert_eq!(harness.transport.request_count(), 2);
}

#[tokio::test]
async fn test_unreachable_without_fresh_cache_reports_status_zero() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1)], 1, 1));

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();

    harness.clock.advance(Duration::minutes(6));
    harness.transport.push_unreachable();
    let err = controller.refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(0));
    assert_eq!(controller.snapshot().await.items.len(), 1);
    assert!(harness
        .notifier
        .last()
        .unwrap()
        .message
        .contains("Cannot connect"));
}

#[tokio::test]
async fn test_filter_bypasses_cache_and_is_sent() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1)], 1, 1));
    harness.transport.push_json(200, history_page(vec![], 1, 0));

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();
    controller
        .set_filter(HistoryFilter {
            method: Some(AccessMethod::Remote),
            search: Some("desk".to_string()),
            ..HistoryFilter::default()
        })
        .await
        .unwrap();

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].query_param("type"), Some("REMOTE"));
    assert_eq!(requests[1].query_param("search"), Some("desk"));
    assert_eq!(requests[1].query_param("page"), Some("1"));
    assert!(controller.snapshot().await.items.is_empty());
}

#[tokio::test]
async fn test_refresh_supersedes_slow_load() {
    let harness = Harness::new();
    harness.sign_in("user");
    let gate = harness
        .transport
        .push_gated_json(200, history_page(vec![record(1, 1)], 1, 1));
    harness
        .transport
        .push_json(200, history_page(vec![record(7, 0)], 1, 1));

    let controller = harness.state.history_controller();
    let (slow, fast) = tokio::join!(controller.load(true), async {
        while harness.transport.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        let result = controller.refresh().await;
        gate.notify_one();
        result
    });
    slow.unwrap();
    fast.unwrap();

    let ids: Vec<i64> = controller
        .snapshot()
        .await
        .items
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![7]);
    assert!(!controller.snapshot().await.loading);
}

#[tokio::test]
async fn test_open_records_stats() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(201, json!({ "message": "Door opened successfully" }));

    let outcome = harness.state.door.open(&Answer(true)).await.unwrap();
    match outcome {
        DoorOutcome::Opened { message, stats } => {
            assert_eq!(message, "Door opened successfully");
            assert_eq!(stats.open_count, 1);
            assert_eq!(stats.last_opened_at, Some(harness.clock.now()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let request = &harness.transport.requests()[0];
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/access/open");
    assert_eq!(request.body, Some(json!({})));
    assert!(harness.store.get(DOOR_STATS_KEY).unwrap().is_some());
    assert!(!harness.state.door.is_opening());
}

#[tokio::test]
async fn test_cancelled_open_sends_nothing() {
    let harness = Harness::new();
    harness.sign_in("user");

    let outcome = harness.state.door.open(&Answer(false)).await.unwrap();
    assert_eq!(outcome, DoorOutcome::Cancelled);
    assert_eq!(harness.transport.request_count(), 0);
    assert_eq!(harness.state.door.stats().open_count, 0);
}

#[tokio::test]
async fn test_second_open_while_in_flight_is_rejected() {
    let harness = Harness::new();
    harness.sign_in("user");
    let gate = harness
        .transport
        .push_gated_json(201, json!({ "message": "Door opened" }));

    let door = &harness.state.door;
    let (first, second) = tokio::join!(door.open(&Answer(true)), async {
        while !door.is_opening() || harness.transport.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        let result = door.open(&Answer(true)).await;
        gate.notify_one();
        result
    });

    assert!(matches!(first, Ok(DoorOutcome::Opened { .. })));
    assert!(matches!(second, Err(DoorError::InProgress)));
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(door.stats().open_count, 1);
    assert!(!door.is_opening());
}

#[tokio::test]
async fn test_failed_open_keeps_stats() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness.transport.push_json(
        503,
        json!({ "statusCode": 503, "message": "Relay offline", "error": "Service Unavailable" }),
    );

    let err = harness.state.door.open(&Answer(true)).await.unwrap_err();
    assert_eq!(door_error_message(&err), "Relay offline");
    assert_eq!(harness.state.door.stats().open_count, 0);
    assert!(!harness.state.door.is_opening());
}

/// Memory store whose disk is full for the door statistics
#[derive(Default)]
struct FullDiskForStats {
    inner: MemoryStore,
}

impl KeyValueStore for FullDiskForStats {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key == DOOR_STATS_KEY {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.keys()
    }
}

#[tokio::test]
async fn test_open_succeeds_when_stats_cannot_be_saved() {
    let harness = Harness::with_store(
        Arc::new(FullDiskForStats::default()),
        Arc::new(UnavailableReader),
    );
    harness.sign_in("user");
    harness
        .transport
        .push_json(201, json!({ "message": "Door opened" }));

    let outcome = harness.state.door.open(&Answer(true)).await.unwrap();
    match outcome {
        DoorOutcome::Opened { message, stats } => {
            assert_eq!(message, "Door opened");
            assert_eq!(stats.open_count, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(harness.transport.request_count(), 1);
    assert_eq!(harness.store.get(DOOR_STATS_KEY).unwrap(), None);
    assert!(!harness.state.door.is_opening());
}

#[tokio::test]
async fn test_open_without_session_asks_to_log_in() {
    let harness = Harness::new();

    let err = harness.state.door.open(&Answer(true)).await.unwrap_err();
    assert!(matches!(err, DoorError::Api(ApiError::Unauthorized)));
    assert_eq!(door_error_message(&err), "Session expired. Please log in again");
    assert_eq!(harness.transport.request_count(), 0);
    assert!(!harness.state.door.is_opening());
}

#[tokio::test]
async fn test_open_invalidates_cached_history() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .transport
        .push_json(200, history_page(vec![record(1, 1)], 1, 1));
    harness.transport.push_json(201, json!({ "message": "ok" }));
    harness
        .transport
        .push_json(200, history_page(vec![record(2, 0), record(1, 1)], 1, 1));

    harness.state.history_controller().load(false).await.unwrap();
    harness.state.door.open(&Answer(true)).await.unwrap();

    let controller = harness.state.history_controller();
    controller.load(false).await.unwrap();
    assert_eq!(controller.snapshot().await.items.len(), 2);
    assert_eq!(harness.transport.request_count(), 3);
}

#[tokio::test]
async fn test_logout_keeps_only_settings() {
    let harness = Harness::new();
    harness.sign_in("user");
    harness
        .store
        .set(APP_SETTINGS_KEY, r#"{"theme":"dark"}"#)
        .unwrap();
    harness.transport.push_json(201, json!({}));
    harness.state.door.open(&Answer(true)).await.unwrap();

    harness.state.auth.logout().unwrap();

    assert_eq!(harness.store.keys().unwrap(), vec![APP_SETTINGS_KEY.to_string()]);
    assert!(!harness.state.session.is_authenticated());
}

#[tokio::test]
async fn test_session_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.json");

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
        let harness = Harness::with_store(store, Arc::new(UnavailableReader));
        harness.sign_in("admin");
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
    let harness = Harness::with_store(store, Arc::new(UnavailableReader));
    let state: &AppState = &harness.state;
    assert!(state.session.is_authenticated());
    assert!(state.session.is_admin());
}
