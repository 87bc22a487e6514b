//! Client-side input checks.
//!
//! These run before any network call, so a rejected input never reaches the
//! backend.

use crate::error::{AuthError, DataError};
use crate::types::Identifier;

pub const MIN_PASSWORD_LEN: usize = 6;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;
const OTP_LEN: usize = 6;

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if local.is_empty() || domain.is_empty() || normalized.chars().any(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

/// Strip formatting from a phone number and check it is `+` plus 7–15 digits
/// (the leading `+` is optional on input and always present on output).
#[must_use]
pub fn normalize_phone(phone: &str) -> Option<String> {
    let stripped: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    let digits = stripped.strip_prefix('+').unwrap_or(&stripped);
    if digits.len() < MIN_PHONE_DIGITS
        || digits.len() > MAX_PHONE_DIGITS
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some(format!("+{digits}"))
}

/// Parse a raw identifier as an email when it contains `@`, else as a phone.
///
/// # Errors
///
/// Returns [`AuthError::MalformedIdentifier`] when neither form validates.
pub fn parse_identifier(raw: &str) -> Result<Identifier, AuthError> {
    if raw.contains('@') {
        return normalize_email(raw)
            .map(Identifier::Email)
            .ok_or_else(|| AuthError::MalformedIdentifier(format!("invalid email address: {}", raw.trim())));
    }
    normalize_phone(raw)
        .map(Identifier::Phone)
        .ok_or_else(|| AuthError::MalformedIdentifier(format!("invalid phone number: {}", raw.trim())))
}

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] when they differ or the password is too short.
pub fn validate_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".to_owned()));
    }
    validate_password_length(password)
}

/// # Errors
///
/// Returns [`AuthError::Validation`] when the password is shorter than [`MIN_PASSWORD_LEN`].
pub fn validate_password_length(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trim a todo title and require it to be non-empty.
///
/// # Errors
///
/// Returns [`DataError::Validation`] for an empty or whitespace-only title.
pub fn validate_title(title: &str) -> Result<String, DataError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DataError::Validation("Title must not be empty".to_owned()));
    }
    Ok(trimmed.to_owned())
}

/// # Errors
///
/// Returns [`AuthError::Validation`] unless the code is exactly six digits.
pub fn validate_otp_code(code: &str) -> Result<String, AuthError> {
    let trimmed = code.trim();
    if trimmed.len() != OTP_LEN || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::Validation(format!("Enter the {OTP_LEN}-digit code")));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
