//! Error taxonomy for auth and data operations.
//!
//! DESIGN
//! ======
//! Every failure carries a machine-readable [`ErrorKind`] plus the
//! human-readable message the backend (or local validation) produced. Backend
//! responses are classified from their structured codes (`error_code` for
//! GoTrue, `code` for PostgREST) and, failing that, the HTTP status. Message
//! text is never inspected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// KIND
// =============================================================================

/// Machine-readable category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCredentials,
    UnconfirmedAccount,
    AlreadyRegistered,
    MalformedIdentifier,
    AuthMisconfiguration,
    BackendUnavailable,
    ValidationError,
    NotAuthenticated,
    NotFound,
    Unexpected,
}

impl ErrorKind {
    /// Stable snake_case name, suitable for logs and JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::UnconfirmedAccount => "unconfirmed_account",
            Self::AlreadyRegistered => "already_registered",
            Self::MalformedIdentifier => "malformed_identifier",
            Self::AuthMisconfiguration => "auth_misconfiguration",
            Self::BackendUnavailable => "backend_unavailable",
            Self::ValidationError => "validation_error",
            Self::NotAuthenticated => "not_authenticated",
            Self::NotFound => "not_found",
            Self::Unexpected => "unexpected",
        }
    }

    /// User-facing message category shown next to the raw backend message.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Email or password is incorrect. Check your details or register an account.",
            Self::UnconfirmedAccount => "This account has not been confirmed yet.",
            Self::AlreadyRegistered => "An account with this identifier already exists. Try signing in instead.",
            Self::MalformedIdentifier => "Enter a valid email address or phone number.",
            Self::AuthMisconfiguration => "The authentication service is misconfigured. Contact an administrator.",
            Self::BackendUnavailable => "The service could not be reached. Try again later.",
            Self::ValidationError => "Check the highlighted input and try again.",
            Self::NotAuthenticated => "You need to sign in first.",
            Self::NotFound => "The requested item no longer exists.",
            Self::Unexpected => "Something went wrong.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// AUTH ERROR
// =============================================================================

/// Errors produced by sign-up, sign-in, session and account operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The identifier/secret pair (or OTP code) was rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The account exists but its email or phone has not been confirmed.
    #[error("account not confirmed: {0}")]
    UnconfirmedAccount(String),

    /// Sign-up for an identifier that already has an account.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// The identifier is not a usable email address or phone number.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Token, signing or key configuration problem on either side.
    #[error("auth misconfiguration: {0}")]
    Misconfiguration(String),

    /// Network or transport failure, or a 5xx from the service.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Local input check failed, or the backend rejected the password strength.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation needs a session and none is held.
    #[error("no active session")]
    NoSession,

    /// Any other backend rejection.
    #[error("backend rejected request (status {status}): {message}")]
    Rejected { status: u16, code: Option<String>, message: String },
}

impl AuthError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
            Self::UnconfirmedAccount(_) => ErrorKind::UnconfirmedAccount,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            Self::Misconfiguration(_) => ErrorKind::AuthMisconfiguration,
            Self::Unavailable(_) => ErrorKind::BackendUnavailable,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::NoSession => ErrorKind::NotAuthenticated,
            Self::Rejected { .. } => ErrorKind::Unexpected,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

// =============================================================================
// DATA ERROR
// =============================================================================

/// Errors produced by todo table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// Local input check failed, or the backend reported a constraint violation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No session is available to scope the operation.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The caller asked for rows of a user other than the signed-in one.
    #[error("requested user {requested} does not match session user {session}")]
    ScopeMismatch { requested: Uuid, session: Uuid },

    /// No row owned by the session user matched the id.
    #[error("todo {0} not found")]
    NotFound(i64),

    /// The backend rejected the credential (expired or invalid JWT).
    #[error("auth misconfiguration: {0}")]
    Misconfiguration(String),

    /// Network or transport failure, or a 5xx from the service.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Any other backend rejection.
    #[error("backend rejected request (status {status}): {message}")]
    Rejected { status: u16, code: Option<String>, message: String },
}

impl DataError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::ScopeMismatch { .. } => ErrorKind::ValidationError,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Misconfiguration(_) => ErrorKind::AuthMisconfiguration,
            Self::Unavailable(_) => ErrorKind::BackendUnavailable,
            Self::Rejected { .. } => ErrorKind::Unexpected,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

// =============================================================================
// WIRE CLASSIFICATION
// =============================================================================

/// Union of the error body shapes GoTrue has shipped: current
/// (`error_code` + `msg`), legacy (`code` + `msg`) and OAuth (`error` +
/// `error_description`).
#[derive(Debug, Default, Deserialize)]
struct GotrueErrorBody {
    code: Option<Value>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GotrueErrorBody {
    fn code(&self) -> Option<String> {
        if let Some(code) = &self.error_code {
            return Some(code.clone());
        }
        if let Some(Value::String(code)) = &self.code {
            return Some(code.clone());
        }
        self.error.clone()
    }

    fn message(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("HTTP {status}") } else { trimmed.to_owned() }
}

/// Classify a non-success GoTrue response.
pub(crate) fn classify_auth(status: u16, body: &str) -> AuthError {
    let parsed: GotrueErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message().unwrap_or_else(|| fallback_message(status, body));
    let code = parsed.code();

    match code.as_deref() {
        Some("invalid_credentials" | "invalid_grant" | "otp_expired") => AuthError::InvalidCredentials(message),
        Some("email_not_confirmed" | "phone_not_confirmed") => AuthError::UnconfirmedAccount(message),
        Some("user_already_exists" | "email_exists" | "phone_exists") => AuthError::AlreadyRegistered(message),
        Some("email_address_invalid" | "validation_failed" | "sms_send_failed") => {
            AuthError::MalformedIdentifier(message)
        }
        Some("bad_jwt" | "no_authorization" | "not_admin" | "session_not_found" | "bad_json") => {
            AuthError::Misconfiguration(message)
        }
        Some("weak_password") => AuthError::Validation(message),
        Some(_) => AuthError::Rejected { status, code, message },
        None => match status {
            401 | 403 => AuthError::Misconfiguration(message),
            422 => AuthError::Validation(message),
            500..=599 => AuthError::Unavailable(message),
            _ => AuthError::Rejected { status, code: None, message },
        },
    }
}

/// Classify a non-success PostgREST response.
pub(crate) fn classify_data(status: u16, body: &str) -> DataError {
    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let mut message = parsed.message.unwrap_or_else(|| fallback_message(status, body));
    if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
        message = format!("{message} ({details})");
    }

    if status >= 500 {
        return DataError::Unavailable(message);
    }
    match parsed.code.as_deref() {
        Some("PGRST300" | "PGRST301" | "PGRST302" | "PGRST303") => DataError::Misconfiguration(message),
        Some(code) if code.starts_with("23") => DataError::Validation(message),
        None if status == 401 => DataError::Misconfiguration(message),
        code => DataError::Rejected { status, code: code.map(str::to_owned), message },
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
