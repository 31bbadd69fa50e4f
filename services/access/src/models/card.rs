//! RFID card models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFID credential registered with the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "isEnabled", default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "deletedAt", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

impl Card {
    /// Soft-deleted cards live in the trash until restored or purged
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Case-insensitive match on name or UID
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.uid.to_lowercase().contains(&needle)
    }
}

/// Body of `POST /cards`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub uid: String,
    pub name: String,
}

/// Body of `PUT /cards/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "isEnabled", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Card returned either bare or wrapped with a message
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CardEnvelope {
    Wrapped {
        #[serde(default)]
        message: Option<String>,
        card: Card,
    },
    Bare(Card),
}

impl CardEnvelope {
    pub fn into_card(self) -> Card {
        match self {
            CardEnvelope::Wrapped { card, .. } => card,
            CardEnvelope::Bare(card) => card,
        }
    }
}

/// Plain `{ message }` acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}
