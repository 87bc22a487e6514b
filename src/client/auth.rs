//! Account and session operations.

use crate::error::AuthError;
use crate::session::AuthEvent;
use crate::types::{Metadata, Session, SignUpOutcome, User};
use crate::validation::{normalize_email, normalize_phone, parse_identifier, validate_otp_code, validate_password_length};

use super::Client;

impl Client {
    /// Create an account for an email address or phone number.
    ///
    /// When the backend confirms accounts automatically the returned outcome
    /// carries a session, which becomes the current one.
    ///
    /// # Errors
    ///
    /// `MalformedIdentifier` or `Validation` before any network call;
    /// `AlreadyRegistered` and the other backend kinds after.
    pub async fn sign_up(
        &self,
        identifier: &str,
        secret: &str,
        metadata: Option<Metadata>,
    ) -> Result<SignUpOutcome, AuthError> {
        let identifier = parse_identifier(identifier)?;
        validate_password_length(secret)?;
        let metadata = metadata.unwrap_or_default();

        let outcome = self.backend.sign_up(&identifier, secret, &metadata).await?;
        tracing::info!(
            user_id = %outcome.user.id,
            confirmed = !outcome.requires_confirmation(),
            "account created"
        );
        if let Some(session) = &outcome.session {
            self.session.set(session.clone(), AuthEvent::SignedIn);
        }
        Ok(outcome)
    }

    /// Password sign-in with an email address or phone number.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `UnconfirmedAccount` and `MalformedIdentifier`
    /// are reported as distinct kinds.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let identifier = parse_identifier(identifier)?;
        if secret.is_empty() {
            return Err(AuthError::Validation("Password must not be empty".to_owned()));
        }
        let session = self.backend.sign_in_with_password(&identifier, secret).await?;
        tracing::info!(user_id = %session.user_id(), "signed in");
        self.session.set(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    /// # Errors
    ///
    /// Backend failures only; anonymous sign-in has no local input to check.
    pub async fn sign_in_anonymously(&self, metadata: Option<Metadata>) -> Result<Session, AuthError> {
        let session = self.backend.sign_up_anonymous(&metadata.unwrap_or_default()).await?;
        tracing::info!(user_id = %session.user_id(), "signed in anonymously");
        self.session.set(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    /// Send a one-time sign-in code by SMS. Creates the account on first use.
    ///
    /// # Errors
    ///
    /// `MalformedIdentifier` for an unusable number, else backend failures.
    pub async fn sign_in_with_otp(&self, phone: &str) -> Result<(), AuthError> {
        let phone = normalize_phone(phone).ok_or_else(|| AuthError::MalformedIdentifier(phone.to_owned()))?;
        self.backend.send_otp(&phone).await?;
        tracing::info!("one-time code sent");
        Ok(())
    }

    /// Complete the phone flow started by [`Client::sign_in_with_otp`].
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed code, `InvalidCredentials` for a wrong or
    /// expired one.
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        let phone = normalize_phone(phone).ok_or_else(|| AuthError::MalformedIdentifier(phone.to_owned()))?;
        let code = validate_otp_code(code)?;
        let session = self.backend.verify_otp(&phone, &code).await?;
        tracing::info!(user_id = %session.user_id(), "signed in with one-time code");
        self.session.set(session.clone(), AuthEvent::SignedIn);
        Ok(session)
    }

    /// End the current session. Idempotent.
    ///
    /// The local session is dropped whatever the backend answers.
    ///
    /// # Errors
    ///
    /// The backend failure, after local state has been cleared.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.session.get() else {
            return Ok(());
        };
        let result = self.backend.sign_out(&session.access_token).await;
        self.session.clear();
        match &result {
            Ok(()) => tracing::info!(user_id = %session.user_id(), "signed out"),
            Err(e) => tracing::warn!(user_id = %session.user_id(), error = %e, "sign-out not confirmed by backend"),
        }
        result
    }

    /// The signed-in user as the backend currently sees it, or `None`.
    ///
    /// A token the backend rejects clears the session. When the backend cannot
    /// be reached the user from the held session is returned.
    pub async fn get_current_user(&self) -> Option<User> {
        let session = match self.active_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(AuthError::Unavailable(_)) => return self.session.get().map(|s| s.user),
            Err(_) => return None,
        };
        match self.backend.get_user(&session.access_token).await {
            Ok(user) => Some(user),
            Err(AuthError::Unavailable(reason)) => {
                tracing::warn!(%reason, "user lookup unavailable; using cached user");
                Some(session.user)
            }
            Err(e) => {
                tracing::info!(user_id = %session.user_id(), error = %e, "session rejected; dropping");
                self.session.clear();
                None
            }
        }
    }

    /// Start the password-reset email flow.
    ///
    /// `redirect_to` overrides the configured `<site>/reset-password` link.
    /// Backend rejections are logged and swallowed so the caller cannot tell
    /// whether the account exists.
    ///
    /// # Errors
    ///
    /// `MalformedIdentifier` for an unusable address, `Unavailable` when the
    /// backend cannot be reached.
    pub async fn reset_password(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::MalformedIdentifier(email.to_owned()))?;
        let redirect = redirect_to.map(str::to_owned).or_else(|| self.config.password_reset_redirect());
        match self.backend.recover_password(&email, redirect.as_deref()).await {
            Ok(()) => {
                tracing::info!("password reset requested");
                Ok(())
            }
            Err(e @ (AuthError::Unavailable(_) | AuthError::Misconfiguration(_))) => Err(e),
            Err(e) => {
                tracing::info!(error = %e, "password reset rejected by backend");
                Ok(())
            }
        }
    }

    /// Exchange the refresh token for a new session now.
    ///
    /// # Errors
    ///
    /// `NoSession` when nothing is held. A rejected refresh also drops the
    /// session.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.session.get().ok_or(AuthError::NoSession)?;
        self.refresh_with(&session).await
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
