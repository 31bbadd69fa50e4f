//! Login, logout and user registration

use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::gateway::Gateway;
use crate::models::{
    Action, LoginCredentials, LoginResponse, NewUser, RegisterRequest, RegisterResponse,
    RegisteredUser,
};
use crate::session::SessionManager;
use crate::validation::{validate_login, validate_new_user};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    gateway: Gateway,
}

impl AuthService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn session(&self) -> &SessionManager {
        self.gateway.session()
    }

    /// Exchange credentials for a token and open the session
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<LoginResponse> {
        validate_login(credentials).map_err(ApiError::InvalidInput)?;
        info!("Login attempt for user: {}", credentials.username);

        let payload = LoginCredentials::new(credentials.username.trim(), &credentials.password);
        let response: LoginResponse = self.gateway.post("/auth/login", &payload).await?;

        if response.access_token.is_empty() {
            error!("Login response carried no access token");
            return Err(ApiError::Decode("missing access_token".to_string()));
        }

        self.session().store_token(&response.access_token)?;
        info!("User {} logged in", credentials.username);
        Ok(response)
    }

    /// End the session locally
    pub fn logout(&self) -> ApiResult<()> {
        self.session().logout()?;
        Ok(())
    }

    /// Create a new user account (administrators only)
    pub async fn register(&self, new_user: &NewUser) -> ApiResult<RegisteredUser> {
        self.session().require(Action::RegisterUser)?;
        validate_new_user(new_user).map_err(ApiError::InvalidInput)?;
        info!("Registering user: {}", new_user.username.trim());

        let request = RegisterRequest::from(new_user);
        let response: RegisterResponse = self.gateway.post("/auth/register", &request).await?;
        Ok(response.into_user())
    }
}

/// Message shown when login fails
pub fn login_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => {
            "Invalid credentials. Check your username and password.".to_string()
        }
        ApiError::Unreachable(_) => {
            "Cannot connect to the server. Check your connection.".to_string()
        }
        ApiError::InvalidInput(message) => message.clone(),
        _ => "Login failed. Please try again.".to_string(),
    }
}

/// Message shown when registration fails
pub fn register_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Conflict(_) => "The username already exists".to_string(),
        ApiError::Validation(_) => "Invalid data. Check the fields".to_string(),
        ApiError::Forbidden => "You do not have permission to perform this action".to_string(),
        ApiError::AccessDenied(_) | ApiError::InvalidInput(_) => err.user_message(),
        ApiError::Unreachable(_) => "Cannot connect to the server".to_string(),
        _ => "Failed to register user".to_string(),
    }
}
