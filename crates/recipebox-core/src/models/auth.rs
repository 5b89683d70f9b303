use serde::{Deserialize, Serialize};

use super::user::User;
use super::validation::{Validator, MIN_NAME_LEN};
use crate::api::ApiError;

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Email is trimmed; the password is taken as typed.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .email("email", &self.email)
            .password("password", &self.password)
            .finish()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        self.validator().finish()
    }

    /// Same as `validate`, plus a check that the password was retyped.
    pub fn validate_with_confirmation(&self, confirmation: &str) -> Result<(), ApiError> {
        let mut validator = self.validator();
        if confirmation.is_empty() {
            validator.check(false, "confirmPassword", "Please confirm your password");
        } else {
            validator.check(
                confirmation == self.password,
                "confirmPassword",
                "Passwords do not match",
            );
        }
        validator.finish()
    }

    fn validator(&self) -> Validator {
        let mut validator = Validator::new();
        let name = self.name.trim();
        if name.is_empty() {
            validator.check(false, "name", "Name is required");
        } else {
            validator.check(
                name.chars().count() >= MIN_NAME_LEN,
                "name",
                "Name must be at least 2 characters",
            );
        }
        validator
            .email("email", &self.email)
            .password("password", &self.password);
        validator
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of login and register: a fresh token/user pair.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Response of `POST /auth/refresh`. The user is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefresh {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}
