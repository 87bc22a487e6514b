//! Privileged account management with the service-role key.
//!
//! Server-side only: obtain one through
//! [`crate::provider::ClientProvider::admin_client`], which refuses in
//! application scope. Users created here are confirmed immediately.

use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::{AuthError, classify_auth};
use crate::types::{Metadata, User};
use crate::validation::{normalize_email, validate_password_length};

pub struct AdminClient {
    http: reqwest::Client,
    url: String,
    service_key: String,
}

impl AdminClient {
    /// # Errors
    ///
    /// `Misconfiguration` when the URL or the service-role key is missing.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let service_key = config
            .service_role_key
            .clone()
            .ok_or_else(|| AuthError::Misconfiguration("service-role key is not configured".to_owned()))?;
        if config.url.is_empty() {
            return Err(AuthError::Misconfiguration("backend URL is not configured".to_owned()));
        }
        Ok(Self { http: reqwest::Client::new(), url: config.auth_url("/admin/users"), service_key })
    }

    /// Create a pre-confirmed user.
    ///
    /// # Errors
    ///
    /// `MalformedIdentifier`/`Validation` before any call, else the classified
    /// backend failure (`AlreadyRegistered` for a taken address).
    pub async fn create_user(&self, email: &str, password: &str, metadata: Metadata) -> Result<User, AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::MalformedIdentifier(email.to_owned()))?;
        validate_password_length(password)?;

        let body = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": metadata,
        });
        let text = Self::send(self.request(Method::POST, self.url.clone()).json(&body)).await?;
        let user: User = serde_json::from_str(&text)
            .map_err(|e| AuthError::Unavailable(format!("unexpected admin response: {e}")))?;
        tracing::info!(user_id = %user.id, "admin created user");
        Ok(user)
    }

    /// # Errors
    ///
    /// The classified backend failure.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AuthError> {
        Self::send(self.request(Method::DELETE, format!("{}/{id}", self.url)))
            .await?;
        tracing::info!(user_id = %id, "admin deleted user");
        Ok(())
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<String, AuthError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            tracing::debug!(status, "admin request rejected");
            return Err(classify_auth(status, &text));
        }
        Ok(text)
    }
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
