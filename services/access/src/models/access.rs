//! Access history models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the door was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMethod {
    #[serde(rename = "RFID")]
    Rfid,
    #[serde(rename = "REMOTE")]
    Remote,
}

impl AccessMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMethod::Rfid => "RFID",
            AccessMethod::Remote => "REMOTE",
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AccessMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RFID" => Ok(AccessMethod::Rfid),
            "REMOTE" => Ok(AccessMethod::Remote),
            other => Err(format!("unknown access type: {}", other)),
        }
    }
}

/// One entry of the access log, mirrored read-only from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub id: i64,
    #[serde(rename = "cardUid", default)]
    pub card_uid: Option<String>,
    #[serde(rename = "cardName", default)]
    pub card_name: Option<String>,
    #[serde(rename = "type")]
    pub method: AccessMethod,
    #[serde(rename = "wasAuthorized")]
    pub authorized: bool,
    pub timestamp: DateTime<Utc>,
}

/// Response of `POST /access/open`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenDoorResponse {
    #[serde(default)]
    pub message: Option<String>,
}
