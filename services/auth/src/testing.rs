//! Test support: a scripted transport and token minting
//!
//! Compiled for this crate's tests and for dependents enabling the
//! `testing` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::sync::Notify;

use crate::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Mint a token the way the backend would; the secret is irrelevant to the client
pub fn token_for(username: &str, role: &str, expires_at: DateTime<Utc>) -> String {
    let claims = serde_json::json!({
        "sub": 1,
        "username": username,
        "role": role,
        "iat": expires_at.timestamp() - 3600,
        "exp": expires_at.timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap_or_default()
}

enum Scripted {
    Ready(Result<HttpResponse, TransportError>),
    Gated(Arc<Notify>, Result<HttpResponse, TransportError>),
}

/// Transport answering from a queue of scripted responses, in order
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, scripted: Scripted) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(scripted);
        }
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push(Scripted::Ready(Ok(HttpResponse {
            status,
            body: body.to_string(),
        })));
    }

    /// Queue a response with an empty body
    pub fn push_empty(&self, status: u16) {
        self.push(Scripted::Ready(Ok(HttpResponse {
            status,
            body: String::new(),
        })));
    }

    /// Queue a connectivity failure
    pub fn push_unreachable(&self) {
        self.push(Scripted::Ready(Err(TransportError::Unreachable(
            "connection refused".to_string(),
        ))));
    }

    /// Queue a JSON response that is only delivered once the returned handle is notified
    pub fn push_gated_json(&self, status: u16, body: serde_json::Value) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Scripted::Gated(
            gate.clone(),
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        ));
        gate
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());

        match next {
            Some(Scripted::Ready(response)) => response,
            Some(Scripted::Gated(gate, response)) => {
                gate.notified().await;
                response
            }
            None => Err(TransportError::Unreachable(
                "no scripted response".to_string(),
            )),
        }
    }
}
