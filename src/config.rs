//! Backend configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Values come from the process environment. For local development an
//! explicit dotenv file (`.env.local` unless `SUPADASH_ENV_FILE` names another)
//! is layered underneath: it fills in unset variables and never overrides
//! exported ones. No credential is compiled into the binary.
//!
//! Loading never fails. A config without URL or key still builds a client; the
//! first call through it then fails with a misconfiguration error.

use std::fmt;
use std::path::PathBuf;

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_SITE_URL: &str = "SUPADASH_SITE_URL";
pub const ENV_FILE_VAR: &str = "SUPADASH_ENV_FILE";
pub const DEFAULT_ENV_FILE: &str = ".env.local";

/// Path appended to the site URL for password-reset links.
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

#[derive(Clone, PartialEq, Eq, Default)]
pub struct BackendConfig {
    /// Service base URL, without trailing slash.
    pub url: String,
    /// Public (anon) API key. Safe to hand to interactive clients.
    pub anon_key: String,
    /// Privileged key for server-side administrative calls only.
    pub service_role_key: Option<String>,
    /// Public URL of this application, used to build redirect links.
    pub site_url: Option<String>,
}

impl BackendConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: normalize_url(&url.into()),
            anon_key: anon_key.into().trim().to_owned(),
            service_role_key: None,
            site_url: None,
        }
    }

    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_owned();
        self.service_role_key = (!key.is_empty()).then_some(key);
        self
    }

    #[must_use]
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        let site_url = normalize_url(&site_url.into());
        self.site_url = (!site_url.is_empty()).then_some(site_url);
        self
    }

    /// Load the local-development env file, then read the environment.
    ///
    /// - `SUPABASE_URL`: service base URL
    /// - `SUPABASE_ANON_KEY`: public API key
    /// - `SUPABASE_SERVICE_ROLE_KEY`: optional, server-side admin calls only
    /// - `SUPADASH_SITE_URL`: optional, base for password-reset redirects
    #[must_use]
    pub fn from_env() -> Self {
        load_local_env_file();
        Self::from_env_vars()
    }

    /// Read the environment only, without consulting any env file.
    #[must_use]
    pub fn from_env_vars() -> Self {
        let mut config = Self::new(
            env_non_empty(ENV_URL).unwrap_or_default(),
            env_non_empty(ENV_ANON_KEY).unwrap_or_default(),
        );
        if let Some(key) = env_non_empty(ENV_SERVICE_ROLE_KEY) {
            config = config.with_service_role_key(key);
        }
        if let Some(site) = env_non_empty(ENV_SITE_URL) {
            config = config.with_site_url(site);
        }
        config
    }

    /// Both URL and public key are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }

    /// `<url>/auth/v1<path>`.
    #[must_use]
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.url)
    }

    /// `<url>/rest/v1<path>`.
    #[must_use]
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1{path}", self.url)
    }

    /// Redirect target for password-reset emails, when a site URL is known.
    #[must_use]
    pub fn password_reset_redirect(&self) -> Option<String> {
        self.site_url.as_ref().map(|site| format!("{site}{RESET_PASSWORD_PATH}"))
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &mask_secret(&self.anon_key))
            .field("service_role_key", &self.service_role_key.as_deref().map(mask_secret))
            .field("site_url", &self.site_url)
            .finish()
    }
}

/// Show only the first and last four characters of a secret.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "<empty>".to_owned();
    }
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// Load the local-development env file into the process environment.
///
/// Returns the path that was loaded, or `None` when no file exists.
pub fn load_local_env_file() -> Option<PathBuf> {
    let path = PathBuf::from(env_non_empty(ENV_FILE_VAR).unwrap_or_else(|| DEFAULT_ENV_FILE.to_owned()));
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no local env file");
        return None;
    }
    match dotenvy::from_path(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "loaded local env file");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load local env file");
            None
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
