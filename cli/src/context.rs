//! Pure helpers behind the command handlers: config resolution, session
//! file location, log level and output shapes.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use supadash::{BackendConfig, User};

pub const SESSION_DIR: &str = ".supadash";
pub const SESSION_FILE: &str = "session.json";

/// `$HOME/.supadash/session.json`, or relative to the working directory
/// when there is no home.
#[must_use]
pub fn default_session_path(home: Option<&Path>) -> PathBuf {
    home.map_or_else(|| PathBuf::from(SESSION_DIR), |h| h.join(SESSION_DIR))
        .join(SESSION_FILE)
}

/// Flags win over the environment for URL and public key; the remaining
/// fields always come from the environment.
#[must_use]
pub fn resolve_config(url: Option<String>, anon_key: Option<String>, env: BackendConfig) -> BackendConfig {
    let mut config = BackendConfig::new(url.unwrap_or(env.url), anon_key.unwrap_or(env.anon_key));
    config.service_role_key = env.service_role_key;
    config.site_url = env.site_url;
    config
}

/// Default filter for `-v` occurrences when `RUST_LOG` is unset.
#[must_use]
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Profile as shown by `whoami` and after sign-in.
#[must_use]
pub fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "display_name": user.display_name(),
        "email": user.email,
        "phone": user.phone,
        "is_anonymous": user.is_anonymous,
        "confirmed": user.is_confirmed(),
        "metadata": user.user_metadata,
    })
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
