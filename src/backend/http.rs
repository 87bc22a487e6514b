//! GoTrue + PostgREST client over `reqwest`.
//!
//! Every request carries the public key in `apikey`. `Authorization` holds
//! the user's access token when there is one, else the public key again.
//! Non-2xx responses are classified by [`crate::error`]; transport and
//! decode failures become `Unavailable`.

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Backend;
use crate::config::BackendConfig;
use crate::error::{AuthError, DataError, classify_auth, classify_data};
use crate::types::{Identifier, Metadata, NewTodo, Session, SignUpOutcome, Todo, User};

const TODOS_PATH: &str = "/todos";

pub struct HttpBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    #[must_use]
    pub fn with_http_client(config: BackendConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn ensure_url(&self) -> Result<(), String> {
        if self.config.url.is_empty() {
            return Err("backend URL is not configured".to_owned());
        }
        Ok(())
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.config.anon_key))
    }

    fn auth(&self, method: Method, path: &str, bearer: Option<&str>) -> Result<RequestBuilder, AuthError> {
        self.ensure_url().map_err(AuthError::Misconfiguration)?;
        Ok(self.request(method, self.config.auth_url(path), bearer))
    }

    fn rest(&self, method: Method, path: &str, access_token: &str) -> Result<RequestBuilder, DataError> {
        self.ensure_url().map_err(DataError::Misconfiguration)?;
        Ok(self.request(method, self.config.rest_url(path), Some(access_token)))
    }

    async fn send_auth(&self, request: RequestBuilder) -> Result<String, AuthError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            tracing::debug!(status, "auth request rejected");
            return Err(classify_auth(status, &text));
        }
        Ok(text)
    }

    async fn send_data(&self, request: RequestBuilder) -> Result<String, DataError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            tracing::debug!(status, "data request rejected");
            return Err(classify_data(status, &text));
        }
        Ok(text)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let request = self
            .auth(Method::POST, "/token", None)?
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let text = self.send_auth(request).await?;
        let token: TokenResponse = decode_auth(&text)?;
        Ok(token.into_session(now()))
    }

    fn todo_filter(request: RequestBuilder, id: i64, user_id: Uuid) -> RequestBuilder {
        request
            .query(&[("id", format!("eq.{id}")), ("user_id", format!("eq.{user_id}"))])
            .header("Prefer", "return=representation")
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

fn default_token_type() -> String {
    "bearer".to_owned()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            user: self.user,
        }
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn decode_auth<T: DeserializeOwned>(text: &str) -> Result<T, AuthError> {
    serde_json::from_str(text).map_err(|e| AuthError::Unavailable(format!("unexpected auth response: {e}")))
}

fn decode_data<T: DeserializeOwned>(text: &str) -> Result<T, DataError> {
    serde_json::from_str(text).map_err(|e| DataError::Unavailable(format!("unexpected data response: {e}")))
}

/// `/signup` answers with a full token response when the account is confirmed
/// immediately, else with the bare user (some versions wrap it in `user`).
fn parse_sign_up(text: &str, now: i64) -> Result<SignUpOutcome, AuthError> {
    let value: Value = decode_auth(text)?;
    if value.get("access_token").is_some_and(|t| !t.is_null()) {
        let token: TokenResponse =
            serde_json::from_value(value).map_err(|e| AuthError::Unavailable(format!("unexpected auth response: {e}")))?;
        let session = token.into_session(now);
        return Ok(SignUpOutcome { user: session.user.clone(), session: Some(session) });
    }
    let user_value = match value.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => value,
    };
    let user: User =
        serde_json::from_value(user_value).map_err(|e| AuthError::Unavailable(format!("unexpected auth response: {e}")))?;
    Ok(SignUpOutcome { user, session: None })
}

fn credential_body(identifier: &Identifier, password: &str) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(identifier.field().to_owned(), Value::String(identifier.as_str().to_owned()));
    body.insert("password".to_owned(), Value::String(password.to_owned()));
    Value::Object(body)
}

// =============================================================================
// BACKEND IMPL
// =============================================================================

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn sign_up(
        &self,
        identifier: &Identifier,
        password: &str,
        metadata: &Metadata,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut body = credential_body(identifier, password);
        body["data"] = Value::Object(metadata.clone());
        let request = self.auth(Method::POST, "/signup", None)?.json(&body);
        let text = self.send_auth(request).await?;
        parse_sign_up(&text, now())
    }

    async fn sign_up_anonymous(&self, metadata: &Metadata) -> Result<Session, AuthError> {
        let request = self
            .auth(Method::POST, "/signup", None)?
            .json(&json!({ "data": metadata }));
        let text = self.send_auth(request).await?;
        let outcome = parse_sign_up(&text, now())?;
        outcome.session.ok_or_else(|| AuthError::Rejected {
            status: 200,
            code: None,
            message: "anonymous sign-up returned no session".to_owned(),
        })
    }

    async fn sign_in_with_password(&self, identifier: &Identifier, password: &str) -> Result<Session, AuthError> {
        self.token_grant("password", credential_body(identifier, password))
            .await
    }

    async fn send_otp(&self, phone: &str) -> Result<(), AuthError> {
        let request = self
            .auth(Method::POST, "/otp", None)?
            .json(&json!({ "phone": phone, "create_user": true }));
        self.send_auth(request).await?;
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        let request = self
            .auth(Method::POST, "/verify", None)?
            .json(&json!({ "type": "sms", "phone": phone, "token": code }));
        let text = self.send_auth(request).await?;
        let token: TokenResponse = decode_auth(&text)?;
        Ok(token.into_session(now()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let request = self.auth(Method::POST, "/logout", Some(access_token))?;
        let response = request.send().await?;
        let status = response.status().as_u16();
        if matches!(status, 401 | 403 | 404) {
            tracing::debug!(status, "logout for unknown session treated as success");
            return Ok(());
        }
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(classify_auth(status, &text));
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        let request = self.auth(Method::GET, "/user", Some(access_token))?;
        let text = self.send_auth(request).await?;
        decode_auth(&text)
    }

    async fn recover_password(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AuthError> {
        let mut request = self.auth(Method::POST, "/recover", None)?;
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }
        self.send_auth(request.json(&json!({ "email": email })))
            .await?;
        Ok(())
    }

    async fn select_todos(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Todo>, DataError> {
        let request = self.rest(Method::GET, TODOS_PATH, access_token)?.query(&[
            ("select", "*".to_owned()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_owned()),
        ]);
        let text = self.send_data(request).await?;
        decode_data(&text)
    }

    async fn insert_todo(&self, access_token: &str, todo: &NewTodo) -> Result<Todo, DataError> {
        let request = self
            .rest(Method::POST, TODOS_PATH, access_token)?
            .header("Prefer", "return=representation")
            .json(&[todo]);
        let text = self.send_data(request).await?;
        let rows: Vec<Todo> = decode_data(&text)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DataError::Unavailable("insert returned no row".to_owned()))
    }

    async fn update_todo(
        &self,
        access_token: &str,
        id: i64,
        user_id: Uuid,
        completed: bool,
    ) -> Result<Vec<Todo>, DataError> {
        let request = Self::todo_filter(self.rest(Method::PATCH, TODOS_PATH, access_token)?, id, user_id)
            .json(&json!({ "completed": completed }));
        let text = self.send_data(request).await?;
        decode_data(&text)
    }

    async fn delete_todo(&self, access_token: &str, id: i64, user_id: Uuid) -> Result<Vec<Todo>, DataError> {
        let request = Self::todo_filter(self.rest(Method::DELETE, TODOS_PATH, access_token)?, id, user_id);
        let text = self.send_data(request).await?;
        decode_data(&text)
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
