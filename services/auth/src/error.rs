//! Error taxonomy for calls against the access-control backend

use common::error::StorageError;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Action;

/// Error type shared by every client service
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401: the session is missing or expired; the gateway has already logged out
    #[error("Unauthorized")]
    Unauthorized,

    /// 403: authenticated but not allowed
    #[error("Forbidden")]
    Forbidden,

    /// No response from the server (status 0)
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// 409: the resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 400: the server rejected the payload
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Any other non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Rejected locally because the session role lacks the capability
    #[error("Access denied: not allowed to {0}")]
    AccessDenied(Action),

    /// Rejected locally before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Local storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error body produced by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<ErrorMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorBody {
    fn messages(self) -> Vec<String> {
        match (self.message, self.error) {
            (Some(ErrorMessage::One(message)), _) => vec![message],
            (Some(ErrorMessage::Many(messages)), _) if !messages.is_empty() => messages,
            (_, Some(error)) => vec![error],
            _ => Vec::new(),
        }
    }
}

impl ApiError {
    /// Build the error for a non-success response
    pub fn from_response(status: u16, body: &str) -> Self {
        let messages = serde_json::from_str::<ErrorBody>(body)
            .map(ErrorBody::messages)
            .unwrap_or_default();
        let joined = messages.join(", ");

        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            409 => ApiError::Conflict(joined),
            400 => ApiError::Validation(messages),
            _ => ApiError::Server {
                status,
                message: joined,
            },
        }
    }

    /// HTTP-like status; 0 means the server could not be reached
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::Unreachable(_) => Some(0),
            ApiError::Conflict(_) => Some(409),
            ApiError::Validation(_) => Some(400),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is a connectivity problem rather than a rejection
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Unreachable(_))
    }

    /// Server-supplied message, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Conflict(message) | ApiError::Server { message, .. }
                if !message.is_empty() =>
            {
                Some(message)
            }
            _ => None,
        }
    }

    /// Generic message for toasts and alerts
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unreachable(_) => "Cannot connect to the server".to_string(),
            ApiError::Unauthorized => "Session expired. Please log in again".to_string(),
            ApiError::Forbidden => "You do not have permission to perform this action".to_string(),
            ApiError::AccessDenied(action) => {
                format!("Access denied: only administrators can {}", action)
            }
            ApiError::Validation(messages) if !messages.is_empty() => messages.join(", "),
            ApiError::InvalidInput(message) => message.clone(),
            _ => "Something went wrong. Please try again".to_string(),
        }
    }
}

/// Type alias for client results
pub type ApiResult<T> = Result<T, ApiError>;
