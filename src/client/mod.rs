//! Client: the session and data access facade.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every page of the app talks to the backend through one of these. A client
//! holds the current session and threads its access token into each backend
//! call, so callers never handle tokens themselves.
//!
//! DESIGN
//! ======
//! Auth operations live in `auth.rs`, todo table operations in `todos.rs`.
//! Both go through [`Client::active_session`], which refreshes an expired
//! session once before use. Each backend call is a single attempt.

mod auth;
mod todos;

use std::sync::Arc;

use crate::backend::Backend;
use crate::backend::http::HttpBackend;
use crate::config::BackendConfig;
use crate::error::AuthError;
use crate::session::{AuthEvent, SessionState, SessionStore, Subscription};
use crate::types::Session;

pub struct Client {
    backend: Arc<dyn Backend>,
    session: SessionState,
    config: BackendConfig,
}

impl Client {
    /// Client over HTTP. Never fails: an unconfigured client errors on its
    /// first call instead.
    #[must_use]
    pub fn new(config: BackendConfig, store: Option<Arc<dyn SessionStore>>) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config.clone()));
        Self::with_backend(backend, config, store)
    }

    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn Backend>,
        config: BackendConfig,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        if !config.is_configured() {
            tracing::warn!("backend URL or public key missing; calls will fail until configured");
        }
        Self { backend, session: SessionState::new(store), config }
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// The held session, as last stored. Not refreshed.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.session.get()
    }

    /// Register `callback` for auth-state changes. It receives
    /// `InitialSession` immediately; dropping the returned handle unregisters it.
    pub fn on_auth_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        self.session.subscribe(callback)
    }

    /// The held session, refreshed once if it has expired.
    ///
    /// A refresh the backend rejects drops the session; a transport failure
    /// keeps it so a later call can retry.
    async fn active_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.session.get() else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }
        tracing::debug!(user_id = %session.user_id(), "session expired; refreshing");
        self.refresh_with(&session).await.map(Some)
    }

    async fn refresh_with(&self, session: &Session) -> Result<Session, AuthError> {
        match self.backend.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                tracing::debug!(user_id = %fresh.user_id(), "session refreshed");
                self.session.set(fresh.clone(), AuthEvent::TokenRefreshed);
                Ok(fresh)
            }
            Err(e @ AuthError::Unavailable(_)) => Err(e),
            Err(e) => {
                tracing::info!(user_id = %session.user_id(), error = %e, "refresh rejected; dropping session");
                self.session.clear();
                Err(e)
            }
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
