//! Application state: every service, constructed once at start-up

use std::sync::Arc;

use anyhow::{Context, Result};
use auth::http::{HttpTransport, ReqwestTransport};
use auth::{ApiError, ApiResult, AuthService, Gateway, SessionManager};
use common::cache::LocalCache;
use common::clock::{Clock, SystemClock};
use common::storage::{FileStore, KeyValueStore, MemoryStore};
use nfc::{NfcReader, NfcScanner, UnavailableReader};
use tracing::{info, warn};

use crate::cards::{CardService, CardsController};
use crate::config::AppConfig;
use crate::door::RemoteDoor;
use crate::enrollment::Enrollment;
use crate::history::{AccessService, HistoryController};
use crate::notify::Notifier;
use crate::pagination::ListController;

/// Services shared by every screen or command
pub struct AppState {
    pub config: AppConfig,
    pub session: SessionManager,
    pub auth: AuthService,
    pub access: AccessService,
    pub cards: CardService,
    pub enrollment: Enrollment,
    pub door: RemoteDoor,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Wire the services over explicit collaborators
    pub fn build(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn HttpTransport>,
        reader: Arc<dyn NfcReader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = SessionManager::with_clock(store.clone(), clock.clone());
        let gateway = Gateway::new(transport, session.clone());
        let cache = LocalCache::with_clock(store.clone(), clock.clone(), config.cache());

        let access = AccessService::new(gateway.clone(), cache.clone());
        let cards = CardService::new(gateway.clone(), cache);
        let scanner = Arc::new(NfcScanner::new(reader, config.nfc()));

        Self {
            auth: AuthService::new(gateway),
            enrollment: Enrollment::new(cards.clone(), scanner),
            door: RemoteDoor::new(access.clone(), store, clock),
            access,
            cards,
            session,
            notifier,
            config,
        }
    }

    /// Wire the production collaborators described by `config`
    pub fn from_config(config: AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(
                FileStore::open(path)
                    .with_context(|| format!("Failed to open storage at {}", path.display()))?,
            ),
            None => {
                warn!("No storage path configured; the session will not survive this process");
                Arc::new(MemoryStore::new())
            }
        };

        let transport = ReqwestTransport::new(&config.transport())
            .context("Failed to build HTTP client")?;

        info!("Using backend at {}", config.api_base_url);
        Ok(Self::build(
            config,
            store,
            Arc::new(SystemClock),
            Arc::new(transport),
            Arc::new(UnavailableReader),
            notifier,
        ))
    }

    /// Route guard: fail unless a live session exists
    pub fn require_session(&self) -> ApiResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    pub fn history_controller(&self) -> HistoryController {
        ListController::new(
            Arc::new(self.access.clone()),
            self.notifier.clone(),
            self.config.history_page_size,
        )
    }

    pub fn cards_controller(&self) -> CardsController {
        CardsController::new(
            self.cards.clone(),
            self.notifier.clone(),
            self.config.cards_page_size,
        )
    }

    /// Release resources before exit
    pub fn shutdown(&self) {
        if self.enrollment.scanner().is_scanning() {
            warn!("Exiting while an NFC scan is still running");
        }
        info!("Client shut down");
    }
}
