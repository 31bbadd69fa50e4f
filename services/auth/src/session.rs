//! Session management on top of device storage
//!
//! The session is nothing more than the bearer token persisted under
//! [`AUTH_TOKEN_KEY`] plus a watch channel carrying the "is authenticated"
//! signal that route guards subscribe to.

use std::sync::Arc;

use common::clock::{Clock, SystemClock};
use common::error::StorageResult;
use common::storage::{APP_SETTINGS_KEY, AUTH_TOKEN_KEY, KeyValueStore};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::jwt::{Claims, JwtDecoder};
use crate::models::{Action, Role, has_capability};

/// Keys that survive logout
const PRESERVED_KEYS: &[&str] = &[APP_SETTINGS_KEY];

/// Session manager for the signed-in user
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    decoder: JwtDecoder,
    authenticated: Arc<watch::Sender<bool>>,
}

impl SessionManager {
    /// Create a session manager using the system clock
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a session manager with an explicit clock
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let (sender, _) = watch::channel(false);
        let session = Self {
            store,
            clock,
            decoder: JwtDecoder::new(),
            authenticated: Arc::new(sender),
        };
        session.authenticated.send_replace(session.is_authenticated());
        session
    }

    /// Current bearer token, if any
    pub fn token(&self) -> StorageResult<Option<String>> {
        self.store.get(AUTH_TOKEN_KEY)
    }

    /// Persist a freshly issued token and raise the authenticated signal
    pub fn store_token(&self, token: &str) -> StorageResult<()> {
        self.store.set(AUTH_TOKEN_KEY, token)?;
        self.authenticated.send_replace(true);
        Ok(())
    }

    /// Decoded claims of the current token
    pub fn claims(&self) -> Option<Claims> {
        let token = match self.token() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read session token: {}", e);
                return None;
            }
        };

        match self.decoder.decode(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!("Failed to decode session token: {}", e);
                None
            }
        }
    }

    /// A token exists and its decoded expiry is in the future. Advisory only.
    pub fn is_authenticated(&self) -> bool {
        self.claims()
            .is_some_and(|claims| claims.is_live_at(self.clock.now()))
    }

    /// Role of the current token
    pub fn role(&self) -> Option<Role> {
        self.claims().map(|claims| claims.role())
    }

    /// Display username of the current token
    pub fn username(&self) -> Option<String> {
        self.claims().and_then(|claims| claims.username)
    }

    /// Whether the token carries the admin role
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether the current role may perform `action`
    pub fn can(&self, action: Action) -> bool {
        self.role()
            .is_some_and(|role| has_capability(&role, action))
    }

    /// Fail locally before any request: [`ApiError::Unauthorized`] without a
    /// live session, [`ApiError::AccessDenied`] when the role lacks `action`
    pub fn require(&self, action: Action) -> ApiResult<()> {
        if !self.is_authenticated() {
            warn!("Blocked {:?} without a live session", action);
            Err(ApiError::Unauthorized)
        } else if self.can(action) {
            Ok(())
        } else {
            warn!("Blocked {:?} for role {:?}", action, self.role());
            Err(ApiError::AccessDenied(action))
        }
    }

    /// Drop the token and every cached value except the settings key
    pub fn logout(&self) -> StorageResult<()> {
        info!("Clearing session");

        let removed = self.store.remove(AUTH_TOKEN_KEY);
        let cleared = self.store.clear_except(PRESERVED_KEYS);
        self.authenticated.send_replace(false);

        removed.and(cleared)
    }

    /// Receiver for the authenticated signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }
}
