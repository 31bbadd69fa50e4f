//! Input validation utilities for the login and registration forms

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{LoginCredentials, NewUser};

/// Validate the login form
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), String> {
    let username = credentials.username.trim();
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if credentials.password.is_empty() {
        return Err("Password is required".to_string());
    }

    if credentials.password.chars().count() < 4 {
        return Err("Password must be at least 4 characters long".to_string());
    }

    Ok(())
}

/// Validate a username for registration
pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();

    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.chars().count() > 50 {
        return Err("Username must be at most 50 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, underscores, hyphens and dots"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate a password for registration
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.chars().count() > 100 {
        return Err("Password must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate the whole registration form
pub fn validate_new_user(user: &NewUser) -> Result<(), String> {
    validate_username(&user.username)?;
    validate_password(&user.password)?;

    if user.confirm_password.is_empty() {
        return Err("Please confirm the password".to_string());
    }

    if user.password != user.confirm_password {
        return Err("Passwords do not match".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("maria.lopez-2_x").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_confirmation_must_match() {
        let user = NewUser {
            username: "maria".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        assert_eq!(validate_new_user(&user), Err("Passwords do not match".to_string()));
    }

    #[test]
    fn test_login_form() {
        assert!(validate_login(&LoginCredentials::new("ab", "1234")).is_err());
        assert!(validate_login(&LoginCredentials::new("abc", "123")).is_err());
        assert!(validate_login(&LoginCredentials::new("abc", "1234")).is_ok());
    }
}
