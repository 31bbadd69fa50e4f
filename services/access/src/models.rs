//! API models for request and response payloads

pub mod access;
pub mod card;

pub use access::{AccessMethod, AccessRecord, OpenDoorResponse};
pub use card::{Card, CardEnvelope, CreateCardRequest, MessageResponse, UpdateCardRequest};
