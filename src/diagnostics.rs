//! Connection and key diagnostics for the debug page and `supadash debug`.
//!
//! Nothing here verifies signatures: JWTs are decoded for display only.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::Client;
use crate::config::{BackendConfig, mask_secret};
use crate::error::classify_data;

const SERVICE_ROLE: &str = "service_role";
const PROBE_TABLE: &str = "todos";

/// Password given to throwaway sign-up accounts.
pub const TEST_SIGN_UP_PASSWORD: &str = "test123456";

// =============================================================================
// CONNECTION PROBE
// =============================================================================

/// Outcome of a request to the REST root. Either `status` or `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Only attempted once the REST root answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_check: Option<TableCheck>,
}

/// Outcome of `select * limit 1` on the todo table with the public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCheck {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableCheck {
    fn failed(status: Option<u16>, error: String) -> Self {
        Self { table: PROBE_TABLE.to_owned(), status, rows: None, error: Some(error) }
    }

    /// The select returned rows (possibly none) without error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl ConnectionReport {
    fn failed(url: String, error: String) -> Self {
        Self { url, status: None, status_text: None, headers: BTreeMap::new(), error: Some(error), table_check: None }
    }

    /// The service answered with any HTTP status.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.status.is_some()
    }
}

/// `GET <url>/rest/v1/` with the public key, then a one-row select on the
/// todo table. Failures are reported in the result rather than returned.
pub async fn probe(config: &BackendConfig) -> ConnectionReport {
    let url = config.rest_url("/");
    if config.url.is_empty() {
        return ConnectionReport::failed(url, "backend URL is not configured".to_owned());
    }
    let http = reqwest::Client::new();
    let response = match http
        .get(&url)
        .header("apikey", &config.anon_key)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(%url, error = %e, "connection probe failed");
            return ConnectionReport::failed(url, e.to_string());
        }
    };

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| (name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect();
    tracing::debug!(%url, status = status.as_u16(), "connection probe answered");
    let table_check = check_table(&http, config).await;
    ConnectionReport {
        url,
        status: Some(status.as_u16()),
        status_text: status.canonical_reason().map(str::to_owned),
        headers,
        error: None,
        table_check: Some(table_check),
    }
}

async fn check_table(http: &reqwest::Client, config: &BackendConfig) -> TableCheck {
    let url = config.rest_url(&format!("/{PROBE_TABLE}?select=*&limit=1"));
    let response = match http
        .get(&url)
        .header("apikey", &config.anon_key)
        .bearer_auth(&config.anon_key)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return TableCheck::failed(None, e.to_string()),
    };
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return TableCheck::failed(Some(status), e.to_string()),
    };
    if !(200..300).contains(&status) {
        let error = classify_data(status, &body);
        tracing::warn!(table = PROBE_TABLE, status, error = %error, "table select failed");
        return TableCheck::failed(Some(status), error.to_string());
    }
    match serde_json::from_str::<Vec<Value>>(&body) {
        Ok(rows) => TableCheck { table: PROBE_TABLE.to_owned(), status: Some(status), rows: Some(rows.len()), error: None },
        Err(e) => TableCheck::failed(Some(status), format!("unexpected select body: {e}")),
    }
}

// =============================================================================
// TEST SIGN-UP
// =============================================================================

/// Result of signing up a throwaway account, next to the decoded public key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpCheck {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// `false` when the service requires confirmation first.
    pub session_issued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_key: Option<DecodedJwt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_error: Option<String>,
}

/// `test_<unix millis>@example.com`.
#[must_use]
pub fn throwaway_email(at: OffsetDateTime) -> String {
    format!("test_{}@example.com", at.unix_timestamp_nanos() / 1_000_000)
}

/// Sign up a throwaway account through `client`. Pass a request-scoped
/// client so the resulting session is never persisted.
pub async fn test_sign_up(client: &Client) -> SignUpCheck {
    let email = throwaway_email(OffsetDateTime::now_utc());
    let (decoded_key, key_error) = match decode_jwt(&client.config().anon_key) {
        Ok(jwt) => (Some(jwt), None),
        Err(e) => (None, Some(e.to_string())),
    };

    match client.sign_up(&email, TEST_SIGN_UP_PASSWORD, None).await {
        Ok(outcome) => SignUpCheck {
            email,
            success: true,
            user_id: Some(outcome.user.id),
            session_issued: outcome.session.is_some(),
            error: None,
            decoded_key,
            key_error,
        },
        Err(e) => {
            tracing::warn!(%email, error = %e, "test sign-up failed");
            SignUpCheck {
                email,
                success: false,
                user_id: None,
                session_issued: false,
                error: Some(e.to_string()),
                decoded_key,
                key_error,
            }
        }
    }
}

// =============================================================================
// JWT DECODE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    /// The token does not have exactly three dot-separated parts.
    #[error("invalid token format: expected 3 parts, found {0}")]
    InvalidFormat(usize),

    /// A segment is not valid base64.
    #[error("invalid base64 in token {segment}: {source}")]
    Base64 { segment: &'static str, source: base64::DecodeError },

    /// A decoded segment is not JSON.
    #[error("invalid JSON in token {segment}: {source}")]
    Json { segment: &'static str, source: serde_json::Error },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedJwt {
    pub header: Value,
    pub payload: Value,
    /// Left encoded; never verified.
    pub signature: String,
}

impl DecodedJwt {
    /// The `role` claim (`anon`, `authenticated`, `service_role`, ...).
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.payload.get("role").and_then(Value::as_str)
    }

    /// The `exp` claim as unix seconds.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.payload.get("exp").and_then(Value::as_i64)
    }
}

/// Split and decode a JWT without verifying it.
///
/// Segments are accepted in URL-safe or standard base64, padded or not.
///
/// # Errors
///
/// Returns an error for a token that is not three segments of base64 JSON.
pub fn decode_jwt(token: &str) -> Result<DecodedJwt, DiagnosticsError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [header, payload, signature] = parts.as_slice() else {
        return Err(DiagnosticsError::InvalidFormat(parts.len()));
    };
    Ok(DecodedJwt {
        header: decode_segment(header, "header")?,
        payload: decode_segment(payload, "payload")?,
        signature: (*signature).to_owned(),
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Value, DiagnosticsError> {
    let trimmed = segment.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|source| DiagnosticsError::Base64 { segment: name, source })?;
    serde_json::from_slice(&bytes).map_err(|source| DiagnosticsError::Json { segment: name, source })
}

// =============================================================================
// CONFIG SUMMARY
// =============================================================================

/// What the debug page shows about the configured keys. Keys are masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub url: String,
    pub anon_key: String,
    pub anon_role: Option<String>,
    pub service_role_key: Option<String>,
    pub service_role: Option<String>,
    pub site_url: Option<String>,
    pub warnings: Vec<String>,
}

impl From<&BackendConfig> for ConfigSummary {
    fn from(config: &BackendConfig) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut warnings = Vec::new();
        if config.url.is_empty() {
            warnings.push("backend URL is not set".to_owned());
        }

        let anon_role = if config.anon_key.is_empty() {
            warnings.push("public key is not set".to_owned());
            None
        } else {
            match decode_jwt(&config.anon_key) {
                Ok(jwt) => {
                    if jwt.role() == Some(SERVICE_ROLE) {
                        warnings.push("public key carries the service_role role; it must never reach clients".to_owned());
                    }
                    if jwt.expires_at().is_some_and(|exp| exp <= now) {
                        warnings.push("public key has expired".to_owned());
                    }
                    jwt.role().map(str::to_owned)
                }
                Err(e) => {
                    warnings.push(format!("public key is not a JWT: {e}"));
                    None
                }
            }
        };

        let service_role = config.service_role_key.as_deref().and_then(|key| match decode_jwt(key) {
            Ok(jwt) => {
                if jwt.role() != Some(SERVICE_ROLE) {
                    warnings.push("service-role key does not carry the service_role role".to_owned());
                }
                jwt.role().map(str::to_owned)
            }
            Err(e) => {
                warnings.push(format!("service-role key is not a JWT: {e}"));
                None
            }
        });

        Self {
            url: config.url.clone(),
            anon_key: mask_secret(&config.anon_key),
            anon_role,
            service_role_key: config.service_role_key.as_deref().map(mask_secret),
            service_role,
            site_url: config.site_url.clone(),
            warnings,
        }
    }
}

#[cfg(test)]
#[path = "diagnostics_test.rs"]
mod tests;
