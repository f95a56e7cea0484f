//! Reqwest-backed adapter for the managed REST backend.
//!
//! Stored procedures and table reads go to the PostgREST surface under
//! `/rest/v1`, identity and account emails to the GoTrue surface under
//! `/auth/v1`. This adapter owns transport details only: URL construction,
//! credential headers, status mapping and JSON decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use tracing::debug;

use super::{AuthProvider, Backend, Identity, InviteRequest, RowQuery};
use crate::error::{AuthProviderError, BackendError};

/// Characters of an error body kept in error messages.
const BODY_PREVIEW_LIMIT: usize = 160;

/// Backend client shared by all requests of a service.
///
/// `reqwest::Client` pools connections internally, so one instance is built
/// at startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: Url,
    service_key: String,
}

impl RestBackend {
    /// Build a backend client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            service_key: service_key.into(),
        })
    }

    /// Base URL of the backend project.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Attach the service credentials.
    fn with_service_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.service_key.as_str())
            .bearer_auth(self.service_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send_backend(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_backend_status(status, &body));
        }
        decode_json(&body).map_err(BackendError::Decode)
    }

    async fn send_auth(&self, request: RequestBuilder) -> Result<Value, AuthProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| status_message(status, &body));
            return Err(AuthProviderError::Rejected(message));
        }
        decode_json(&body).map_err(AuthProviderError::Decode)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn rpc(&self, name: &str, params: Value) -> Result<Value, BackendError> {
        let url = endpoint_url(&self.base_url, &format!("rest/v1/rpc/{}", name))
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        debug!(rpc = name, "Calling stored procedure");

        let request = self.with_service_auth(self.client.post(url)).json(&params);
        self.send_backend(request).await
    }

    async fn select(&self, query: &RowQuery) -> Result<Vec<Value>, BackendError> {
        let mut url = endpoint_url(&self.base_url, &format!("rest/v1/{}", query.table()))
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        debug!(table = query.table(), "Selecting rows");

        match self.send_backend(self.with_service_auth(self.client.get(url))).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(BackendError::Decode(format!(
                "expected an array of rows, got {}",
                json_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthProviderError> {
        let url = endpoint_url(&self.base_url, "auth/v1/user")
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;

        let request = self
            .client
            .get(url)
            .header("apikey", self.service_key.as_str())
            .bearer_auth(token);
        let user = self.send_auth(request).await?;
        serde_json::from_value(user).map_err(|e| AuthProviderError::Decode(e.to_string()))
    }

    async fn invite_user(&self, invite: &InviteRequest) -> Result<(), AuthProviderError> {
        let mut url = endpoint_url(&self.base_url, "auth/v1/invite")
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("redirect_to", &invite.redirect_to);

        let body = json!({
            "email": invite.email,
            "data": {
                "role": invite.role,
                "invitation_code": invite.invitation_code,
                "sender": invite.sender,
            },
        });
        let request = self.with_service_auth(self.client.post(url)).json(&body);
        self.send_auth(request).await.map(|_| ())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthProviderError> {
        let mut url = endpoint_url(&self.base_url, "auth/v1/recover")
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let request = self
            .with_service_auth(self.client.post(url))
            .json(&json!({ "email": email }));
        self.send_auth(request).await.map(|_| ())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Join a relative API path onto the project base URL.
///
/// Unlike `Url::join`, a base path without a trailing slash is kept.
fn endpoint_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))
}

/// Decode a response body; an empty body is JSON null.
fn decode_json(body: &[u8]) -> Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| format!("invalid JSON payload: {}", e))
}

/// Pull a human readable message out of an error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    BackendError::Transport(error.to_string())
}

fn map_backend_status(status: StatusCode, body: &[u8]) -> BackendError {
    match error_message(body) {
        Some(message) => BackendError::Rpc { message },
        None => BackendError::Status {
            status: status.as_u16(),
            body: body_preview(body),
        },
    }
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    }
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    compact.chars().take(BODY_PREVIEW_LIMIT).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
