//! Client lifecycle per execution context.
//!
//! DESIGN
//! ======
//! An interactive, long-lived context shares one client (and one session)
//! across every caller. Per-request work gets a fresh client each time so no
//! session leaks between requests. The choice is explicit [`ClientScope`]
//! state on the provider rather than a process-wide global.

use std::sync::{Arc, OnceLock};

use crate::admin::AdminClient;
use crate::backend::Backend;
use crate::backend::http::HttpBackend;
use crate::client::Client;
use crate::config::BackendConfig;
use crate::error::AuthError;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientScope {
    /// Long-lived interactive context: one shared client, persisted session.
    Application,
    /// Server-side request handling: a new client per call, never persisted.
    Request,
}

type BackendFactory = Arc<dyn Fn(&BackendConfig) -> Arc<dyn Backend> + Send + Sync>;

pub struct ClientProvider {
    config: BackendConfig,
    scope: ClientScope,
    store: Option<Arc<dyn SessionStore>>,
    shared: OnceLock<Arc<Client>>,
    factory: BackendFactory,
}

impl ClientProvider {
    /// Shared-client provider. `store` keeps the session between runs.
    #[must_use]
    pub fn application(config: BackendConfig, store: Option<Arc<dyn SessionStore>>) -> Self {
        Self::build(config, ClientScope::Application, store)
    }

    /// Fresh-client-per-call provider.
    #[must_use]
    pub fn request(config: BackendConfig) -> Self {
        Self::build(config, ClientScope::Request, None)
    }

    fn build(config: BackendConfig, scope: ClientScope, store: Option<Arc<dyn SessionStore>>) -> Self {
        Self {
            config,
            scope,
            store,
            shared: OnceLock::new(),
            factory: Arc::new(http_backend),
        }
    }

    /// Replace how backends are built for new clients.
    #[must_use]
    pub fn with_backend_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&BackendConfig) -> Arc<dyn Backend> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    #[must_use]
    pub fn scope(&self) -> ClientScope {
        self.scope
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// The shared client in application scope; a new one in request scope.
    #[must_use]
    pub fn get_client(&self) -> Arc<Client> {
        match self.scope {
            ClientScope::Application => Arc::clone(self.shared.get_or_init(|| {
                tracing::debug!("creating shared client");
                Arc::new(self.new_client(self.store.clone()))
            })),
            ClientScope::Request => Arc::new(self.new_client(None)),
        }
    }

    /// Privileged client for server-side account management.
    ///
    /// # Errors
    ///
    /// `Misconfiguration` in application scope, or when no service-role key
    /// is configured.
    pub fn admin_client(&self) -> Result<AdminClient, AuthError> {
        if self.scope == ClientScope::Application {
            return Err(AuthError::Misconfiguration(
                "admin client is only available in request scope".to_owned(),
            ));
        }
        AdminClient::new(&self.config)
    }

    fn new_client(&self, store: Option<Arc<dyn SessionStore>>) -> Client {
        Client::with_backend((self.factory)(&self.config), self.config.clone(), store)
    }
}

fn http_backend(config: &BackendConfig) -> Arc<dyn Backend> {
    Arc::new(HttpBackend::new(config.clone()))
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
