//! Card enrollment from an NFC scan or manual entry

use std::sync::Arc;

use auth::ApiError;
use auth::models::Action;
use nfc::{NfcError, NfcScanner};
use thiserror::Error;
use tracing::{info, warn};

use crate::cards::{CardService, create_error_message};
use crate::models::Card;

/// Longest UID accepted, in characters
pub const MAX_UID_LEN: usize = 50;

/// Trim and check a UID: 1 to 50 characters of any kind
pub fn validate_uid(uid: &str) -> Result<String, String> {
    let uid = uid.trim();
    match uid.chars().count() {
        0 => Err("The card UID is required".to_string()),
        n if n > MAX_UID_LEN => Err(format!(
            "The card UID must be at most {} characters",
            MAX_UID_LEN
        )),
        _ => Ok(uid.to_string()),
    }
}

/// Trim and check a card's display name
pub fn validate_card_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("The card name is required".to_string());
    }
    Ok(name.to_string())
}

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Nfc(#[from] NfcError),

    #[error("Card {0} is already registered")]
    AlreadyRegistered(String),
}

impl EnrollmentError {
    pub fn user_message(&self) -> String {
        match self {
            EnrollmentError::Api(err) => create_error_message(err),
            EnrollmentError::Nfc(NfcError::Unavailable) => {
                "NFC is not available. Enable it or enter the UID manually".to_string()
            }
            EnrollmentError::Nfc(err) => err.to_string(),
            EnrollmentError::AlreadyRegistered(uid) => {
                format!("The card {} is already registered", uid)
            }
        }
    }
}

/// A UID ready to be named and submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentDraft {
    pub uid: String,
}

/// Enrollment workflow
#[derive(Clone)]
pub struct Enrollment {
    cards: CardService,
    scanner: Arc<NfcScanner>,
}

impl Enrollment {
    pub fn new(cards: CardService, scanner: Arc<NfcScanner>) -> Self {
        Self { cards, scanner }
    }

    pub fn scanner(&self) -> &NfcScanner {
        &self.scanner
    }

    /// Scan a tag and check it is not already enrolled
    pub async fn scan(&self) -> Result<EnrollmentDraft, EnrollmentError> {
        self.cards.gateway().session().require(Action::CreateCard)?;

        let uid = self.scanner.scan_uid().await?;
        let uid = validate_uid(&uid).map_err(ApiError::InvalidInput)?;

        if self.cards.is_uid_registered(&uid).await? {
            warn!("Scanned card {} is already registered", uid);
            return Err(EnrollmentError::AlreadyRegistered(uid));
        }

        info!("Scanned new card {}", uid);
        Ok(EnrollmentDraft { uid })
    }

    /// Create the card for a scanned draft
    pub async fn submit(&self, draft: &EnrollmentDraft, name: &str) -> Result<Card, EnrollmentError> {
        Ok(self.cards.create(&draft.uid, name).await?)
    }

    /// Create a card from a typed UID
    pub async fn manual(&self, uid: &str, name: &str) -> Result<Card, EnrollmentError> {
        Ok(self.cards.create(uid, name).await?)
    }
}
