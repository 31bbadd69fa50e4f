//! Role model and capability checks
//!
//! Capabilities only gate what the client offers; the backend repeats every
//! check and stays the enforcement point.

use std::fmt;

/// Role carried in the token's `role` claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Other(String),
}

impl Role {
    /// Parse a role claim (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "user" => Role::User,
            other => Role::Other(other.to_string()),
        }
    }

    /// Get the role name as a string
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Other(name) => name,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a user can ask the client to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewHistory,
    OpenDoor,
    ViewCards,
    CreateCard,
    UpdateCard,
    DeleteCard,
    RestoreCard,
    PurgeCard,
    RegisterUser,
}

impl Action {
    /// Whether only administrators may perform the action
    pub fn is_privileged(self) -> bool {
        !matches!(
            self,
            Action::ViewHistory | Action::OpenDoor | Action::ViewCards
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::ViewHistory => "view access history",
            Action::OpenDoor => "open the door",
            Action::ViewCards => "view cards",
            Action::CreateCard => "create cards",
            Action::UpdateCard => "update cards",
            Action::DeleteCard => "delete cards",
            Action::RestoreCard => "restore cards",
            Action::PurgeCard => "permanently delete cards",
            Action::RegisterUser => "register users",
        };
        f.write_str(name)
    }
}

/// Whether `role` may perform `action`
pub fn has_capability(role: &Role, action: Action) -> bool {
    match role {
        Role::Admin => true,
        _ => !action.is_privileged(),
    }
}
