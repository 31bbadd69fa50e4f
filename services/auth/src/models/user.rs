//! User-facing payloads for login and registration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Registration form as filled in by an administrator
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl From<&NewUser> for RegisterRequest {
    fn from(user: &NewUser) -> Self {
        Self {
            username: user.username.trim().to_string(),
            password: user.password.clone(),
        }
    }
}

/// User created by a registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The backend either returns the user directly or wraps it with a message
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Wrapped {
        #[serde(default)]
        message: Option<String>,
        user: RegisteredUser,
    },
    Bare(RegisteredUser),
}

impl RegisterResponse {
    pub fn into_user(self) -> RegisteredUser {
        match self {
            RegisterResponse::Wrapped { user, .. } => user,
            RegisterResponse::Bare(user) => user,
        }
    }
}
