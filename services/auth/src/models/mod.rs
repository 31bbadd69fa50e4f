//! Authentication models

pub mod role;
pub mod user;

// Re-export for convenience
pub use role::{Action, Role, has_capability};
pub use user::{
    LoginCredentials, LoginResponse, NewUser, RegisterRequest, RegisterResponse, RegisteredUser,
};
