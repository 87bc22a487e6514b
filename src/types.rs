//! Domain types shared by the facade, the backend seam and the CLI.
//!
//! SYSTEM CONTEXT
//! ==============
//! `User` and `Session` mirror GoTrue's JSON; `Todo` mirrors a row of the
//! `todos` table as PostgREST returns it. They double as the on-disk format of
//! a persisted session.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Seconds before `expires_at` at which a session already counts as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// Free-form user metadata (e.g. `display_name`).
pub type Metadata = Map<String, Value>;

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

// =============================================================================
// IDENTIFIER
// =============================================================================

/// A sign-in identifier: either an email address or a phone number.
///
/// Build through [`crate::validation::parse_identifier`] (or `str::parse`),
/// which normalizes and validates the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) => v,
        }
    }

    /// JSON field name GoTrue expects for this identifier.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Identifier {
    type Err = crate::error::AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validation::parse_identifier(s)
    }
}

// =============================================================================
// USER
// =============================================================================

/// An account as reported by the auth service. Read-only from this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub user_metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_confirmed_at: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl User {
    /// The email, else the phone number. `None` for anonymous users.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.email.as_deref().or(self.phone.as_deref())
    }

    /// Whether the identifier this user registered with has been confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some() || self.phone_confirmed_at.is_some()
    }

    /// Display name from metadata, falling back to the email local part.
    #[must_use]
    pub fn display_name(&self) -> String {
        for key in ["display_name", "username", "name"] {
            if let Some(name) = self.user_metadata.get(key).and_then(Value::as_str) {
                if !name.trim().is_empty() {
                    return name.trim().to_owned();
                }
            }
        }
        if let Some(local) = self.email.as_deref().and_then(|e| e.split('@').next()) {
            if !local.is_empty() {
                return local.to_owned();
            }
        }
        if let Some(phone) = &self.phone {
            return phone.clone();
        }
        "anonymous".to_owned()
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Bearer-credential state for an authenticated (or anonymous) user.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Lifetime in seconds as issued.
    pub expires_in: i64,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Unix seconds at which the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.expires_at - self.expires_in
    }

    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc().unix_timestamp())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up: the created user, plus a session when the service
/// confirms accounts automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

impl SignUpOutcome {
    /// `true` when the account must be confirmed before sign-in succeeds.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

// =============================================================================
// TODO
// =============================================================================

/// A row of the `todos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_id: Uuid,
}

/// Insert payload for the `todos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTodo {
    pub title: String,
    pub user_id: Uuid,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
