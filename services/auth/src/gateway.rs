//! HTTP gateway with bearer injection and 401 teardown
//!
//! Every request to the backend goes through [`Gateway`]. It attaches the
//! session token to non-public routes, maps failures into [`ApiError`] and
//! forces a logout whenever the backend answers 401, whatever the caller was
//! doing.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use crate::error::{ApiError, ApiResult};
use crate::http::{HttpRequest, HttpTransport, Method, TransportError};
use crate::session::SessionManager;

/// Routes that must never carry a bearer token
const PUBLIC_ROUTES: &[&str] = &["/auth/login"];

/// Typed access to the backend REST API
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn HttpTransport>,
    session: SessionManager,
}

impl Gateway {
    pub fn new(transport: Arc<dyn HttpTransport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    /// Session the gateway authenticates with
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ApiResult<T> {
        let mut request = HttpRequest::new(Method::Get, path);
        request.query = query;
        self.execute(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.execute(Self::with_body(Method::Post, path, body)?)
            .await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.execute(Self::with_body(Method::Put, path, body)?)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.execute(Self::with_body(Method::Patch, path, body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(HttpRequest::new(Method::Delete, path)).await
    }

    fn with_body<B: Serialize + ?Sized>(
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<HttpRequest> {
        let mut request = HttpRequest::new(method, path);
        request.body = Some(
            serde_json::to_value(body).map_err(|e| ApiError::InvalidInput(e.to_string()))?,
        );
        Ok(request)
    }

    fn is_public(path: &str) -> bool {
        PUBLIC_ROUTES.iter().any(|route| path.starts_with(route))
    }

    async fn execute<T: DeserializeOwned>(&self, mut request: HttpRequest) -> ApiResult<T> {
        if !Self::is_public(&request.path) {
            request.bearer = self.session.token()?;
        }

        let method = request.method;
        let path = request.path.clone();

        let response = self.transport.send(request).await.map_err(|e| match e {
            TransportError::Unreachable(reason) => ApiError::Unreachable(reason),
            TransportError::InvalidRequest(reason) => ApiError::InvalidInput(reason),
        })?;

        debug!("{} {} -> {}", method.as_str(), path, response.status);

        if response.status == 401 {
            warn!("{} {} returned 401; ending session", method.as_str(), path);
            if let Err(e) = self.session.logout() {
                error!("Failed to clear session after 401: {}", e);
            }
            return Err(ApiError::Unauthorized);
        }

        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body));
        }

        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| {
            error!("Unexpected body from {} {}: {}", method.as_str(), path, e);
            ApiError::Decode(e.to_string())
        })
    }
}
