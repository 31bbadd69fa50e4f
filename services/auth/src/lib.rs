//! Session and HTTP gateway for the access-control client
//!
//! This crate owns everything between the client and the backend's REST
//! API: the transport, the gateway that injects bearer tokens and tears the
//! session down on 401, the persisted session itself, the advisory JWT
//! decoder and the role capabilities used to hide admin-only actions.

pub mod error;
pub mod gateway;
pub mod http;
pub mod jwt;
pub mod models;
pub mod service;
pub mod session;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ApiError, ApiResult};
pub use gateway::Gateway;
pub use service::AuthService;
pub use session::SessionManager;
