//! JWT payload decoding for display purposes
//!
//! The client reads the username, role and expiry out of the bearer token
//! so it can label the profile screen and hide admin-only actions. The
//! signature is never checked here: the token is opaque to the client and
//! only the backend can trust it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Claims the client cares about
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID (number or string depending on the backend)
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    /// Display username
    #[serde(default)]
    pub username: Option<String>,
    /// Role name
    #[serde(default)]
    pub role: Option<String>,
    /// Issued at time
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiration time
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    /// Role parsed from the claim; a token without one is treated as a plain user
    pub fn role(&self) -> Role {
        self.role
            .as_deref()
            .map(Role::parse)
            .unwrap_or(Role::User)
    }

    /// A token without `exp` is never considered live
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp > now.timestamp())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Payload decoder with signature and time validation turned off
#[derive(Clone)]
pub struct JwtDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl Default for JwtDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtDecoder {
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&[]),
            validation,
        }
    }

    /// Decode the payload segment of `token`
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_without_knowing_the_secret() {
        let raw = token(&serde_json::json!({
            "sub": 3,
            "username": "maria",
            "role": "admin",
            "iat": 1_700_000_000,
            "exp": 1_700_003_600,
        }));

        let claims = JwtDecoder::new().decode(&raw).unwrap();
        assert_eq!(claims.username.as_deref(), Some("maria"));
        assert_eq!(claims.role(), Role::Admin);
        assert_eq!(claims.exp, Some(1_700_003_600));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let raw = token(&serde_json::json!({ "username": "old", "exp": 10 }));
        let claims = JwtDecoder::new().decode(&raw).unwrap();
        assert!(!claims.is_live_at(Utc::now()));
    }

    #[test]
    fn test_missing_exp_is_not_live() {
        let raw = token(&serde_json::json!({ "username": "noexp" }));
        let claims = JwtDecoder::new().decode(&raw).unwrap();
        assert!(!claims.is_live_at(Utc::now()));
        assert_eq!(claims.role(), Role::User);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(JwtDecoder::new().decode("not-a-token").is_err());
        assert!(JwtDecoder::new().decode("a.b.c").is_err());
    }
}
