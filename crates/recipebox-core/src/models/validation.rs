//! Field checks shared by the request payloads.

use crate::api::error::FieldErrors;
use crate::api::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

/// Loose `something@something.something` check. Any whitespace-separated
/// token of that shape is accepted.
pub fn is_valid_email(email: &str) -> bool {
    email.split_whitespace().any(|token| {
        let Some(at) = token.find('@') else {
            return false;
        };
        if at == 0 {
            return false;
        }
        let domain = &token[at + 1..];
        match domain.rfind('.') {
            Some(dot) => dot > 0 && dot + 1 < domain.len(),
            None => false,
        }
    })
}

/// Collects per-field messages; the first message for a field wins.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok && !self.errors.contains_key(field) {
            self.errors.insert(field.to_string(), message.to_string());
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.check(false, field, "Email is required")
        } else {
            self.check(is_valid_email(value), field, "Email is invalid")
        }
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.check(false, field, "Password is required")
        } else {
            self.check(
                value.chars().count() >= MIN_PASSWORD_LEN,
                field,
                "Password must be at least 6 characters",
            )
        }
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(std::mem::take(&mut self.errors)))
        }
    }
}
