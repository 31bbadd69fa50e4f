//! Remote door open with confirmation and local statistics

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use auth::models::Action;
use auth::ApiError;
use chrono::{DateTime, Utc};
use common::clock::Clock;
use common::error::StorageResult;
use common::storage::{DOOR_STATS_KEY, KeyValueStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::history::AccessService;

/// Explicit user confirmation before opening
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Display-only statistics of remote opens from this device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorStats {
    #[serde(rename = "lastOpenedAt")]
    pub last_opened_at: Option<DateTime<Utc>>,
    #[serde(rename = "openCount")]
    pub open_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorOutcome {
    Opened { message: String, stats: DoorStats },
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DoorError {
    #[error("A door open request is already in progress")]
    InProgress,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Message shown when opening fails
pub fn door_error_message(err: &DoorError) -> String {
    match err {
        DoorError::InProgress => err.to_string(),
        DoorError::Api(ApiError::Unauthorized) => "Session expired. Please log in again".to_string(),
        DoorError::Api(ApiError::Forbidden) => {
            "You do not have permission to open the door".to_string()
        }
        DoorError::Api(ApiError::Unreachable(_)) => "Cannot reach the server".to_string(),
        DoorError::Api(api) => api
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| "Failed to open the door".to_string()),
    }
}

const CONFIRM_PROMPT: &str = "Open the door now?";
const DEFAULT_SUCCESS: &str = "Door opened";

/// Clears the in-flight flag however the request ends
struct OpeningGuard<'a>(&'a AtomicBool);

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Remote open action for the door screen
pub struct RemoteDoor {
    access: AccessService,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    opening: AtomicBool,
}

impl RemoteDoor {
    pub fn new(access: AccessService, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            access,
            store,
            clock,
            opening: AtomicBool::new(false),
        }
    }

    pub fn is_opening(&self) -> bool {
        self.opening.load(Ordering::SeqCst)
    }

    /// Stored statistics; unreadable values count as none
    pub fn stats(&self) -> DoorStats {
        match self.store.get(DOOR_STATS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable door stats: {}", e);
                DoorStats::default()
            }),
            Ok(None) => DoorStats::default(),
            Err(e) => {
                warn!("Failed to read door stats: {}", e);
                DoorStats::default()
            }
        }
    }

    /// Confirm, then ask the backend to open. A second call while one is in
    /// flight fails with [`DoorError::InProgress`] without any request.
    pub async fn open(&self, confirm: &dyn Confirm) -> Result<DoorOutcome, DoorError> {
        if self.opening.swap(true, Ordering::SeqCst) {
            return Err(DoorError::InProgress);
        }
        let _guard = OpeningGuard(&self.opening);

        self.access
            .gateway()
            .session()
            .require(Action::OpenDoor)?;

        if !confirm.confirm(CONFIRM_PROMPT).await {
            info!("Door open cancelled");
            return Ok(DoorOutcome::Cancelled);
        }

        let response = self.access.open_door().await?;
        let stats = self.record_open();
        let message = response
            .message
            .unwrap_or_else(|| DEFAULT_SUCCESS.to_string());

        info!("Door opened ({} opens from this device)", stats.open_count);
        Ok(DoorOutcome::Opened { message, stats })
    }

    /// Bump the counters. The door is already open, so a failed write only
    /// costs the persisted copy.
    fn record_open(&self) -> DoorStats {
        let mut stats = self.stats();
        stats.last_opened_at = Some(self.clock.now());
        stats.open_count += 1;

        if let Err(e) = self.save_stats(&stats) {
            warn!("Failed to save door stats: {}", e);
        }
        stats
    }

    fn save_stats(&self, stats: &DoorStats) -> StorageResult<()> {
        let raw = serde_json::to_string(stats)?;
        self.store.set(DOOR_STATS_KEY, &raw)
    }
}
