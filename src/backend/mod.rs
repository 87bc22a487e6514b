//! Backend: the declared interface to the external auth + database service.
//!
//! SYSTEM CONTEXT
//! ==============
//! The facade never talks HTTP directly. It calls a [`Backend`], which is
//! the opaque service as seen from this side: GoTrue-style auth endpoints and
//! a PostgREST-style `todos` table. [`http::HttpBackend`] is the production
//! implementation; tests substitute an in-memory one.
//!
//! Every call is a single attempt. Access tokens are passed explicitly so an
//! implementation holds no session state of its own.

pub mod http;
#[cfg(test)]
pub(crate) mod memory;

use uuid::Uuid;

use crate::error::{AuthError, DataError};
use crate::types::{Identifier, Metadata, NewTodo, Session, SignUpOutcome, Todo, User};

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Create an account with a password.
    async fn sign_up(
        &self,
        identifier: &Identifier,
        password: &str,
        metadata: &Metadata,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Create an anonymous account and session.
    async fn sign_up_anonymous(&self, metadata: &Metadata) -> Result<Session, AuthError>;

    /// Password grant.
    async fn sign_in_with_password(&self, identifier: &Identifier, password: &str) -> Result<Session, AuthError>;

    /// Send a one-time code to a phone number.
    async fn send_otp(&self, phone: &str) -> Result<(), AuthError>;

    /// Exchange a one-time code for a session.
    async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError>;

    /// Refresh-token grant.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Revoke the session behind `access_token`. A token the service no
    /// longer recognizes counts as already signed out.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve `access_token` to its user.
    async fn get_user(&self, access_token: &str) -> Result<User, AuthError>;

    /// Start the out-of-band password-reset flow for `email`.
    async fn recover_password(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AuthError>;

    /// Rows owned by `user_id`, newest first.
    async fn select_todos(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Todo>, DataError>;

    /// Insert one row and return it as stored.
    async fn insert_todo(&self, access_token: &str, todo: &NewTodo) -> Result<Todo, DataError>;

    /// Set `completed` on the row matching both `id` and `user_id`. Returns the
    /// updated rows (empty when nothing matched).
    async fn update_todo(
        &self,
        access_token: &str,
        id: i64,
        user_id: Uuid,
        completed: bool,
    ) -> Result<Vec<Todo>, DataError>;

    /// Delete the row matching both `id` and `user_id`. Returns the deleted
    /// rows (empty when nothing matched).
    async fn delete_todo(&self, access_token: &str, id: i64, user_id: Uuid) -> Result<Vec<Todo>, DataError>;
}
