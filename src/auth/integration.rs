//! Integration token validation.
//!
//! Integration tokens are opaque to the gateway. Validity, quotas and
//! revocation are decided by the `validate_integration_token` stored
//! procedure, which also records the access attempt on its side.

use std::sync::Arc;

use http::{HeaderMap, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::token::fingerprint;
use crate::backend::Backend;
use crate::error::ApiError;
use crate::server::body::id_text;

/// Stored procedure that checks an integration token.
pub const VALIDATE_TOKEN_RPC: &str = "validate_integration_token";

// =============================================================================
// Request Metadata
// =============================================================================

/// Request attributes forwarded to the backend for auditing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Normalized request path
    pub endpoint: String,

    /// HTTP method name
    pub method: String,

    /// Client address as reported by the edge proxy
    pub ip_address: Option<String>,

    /// Client user agent
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Collect metadata from the request line and headers.
    ///
    /// The client address comes from `x-forwarded-for`, falling back to
    /// `cf-connecting-ip`.
    pub fn from_request(method: &Method, endpoint: &str, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            endpoint: endpoint.to_string(),
            method: method.as_str().to_string(),
            ip_address: header("x-forwarded-for").or_else(|| header("cf-connecting-ip")),
            user_agent: header("user-agent"),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Identity attached to a request carrying a valid integration token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationContext {
    pub token_id: String,
    pub user_id: String,
}

/// Row returned by the validation procedure.
#[derive(Debug, Deserialize)]
struct TokenValidation {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    rate_limit_exceeded: Option<bool>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    token_id: Option<Value>,
    #[serde(default)]
    user_id: Option<Value>,
}

/// Validates integration tokens against the backend.
pub struct IntegrationValidator<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> IntegrationValidator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Validate `token` for the request described by `meta`.
    ///
    /// # Errors
    ///
    /// - 500 `validation_failed` when the procedure errors or returns garbage
    /// - 401 `invalid_token` when no record comes back or the token is invalid
    /// - 429 `rate_limit_exceeded` when the token is over quota
    pub async fn validate(
        &self,
        token: &str,
        meta: &RequestMeta,
    ) -> Result<IntegrationContext, ApiError> {
        let params = json!({
            "p_token": token,
            "p_endpoint": meta.endpoint,
            "p_method": meta.method,
            "p_ip_address": meta.ip_address,
            "p_user_agent": meta.user_agent,
        });

        let result = self
            .backend
            .rpc(VALIDATE_TOKEN_RPC, params)
            .await
            .map_err(|e| ApiError::backend("validation_failed", e))?;

        let record = match result {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            _ => {
                debug!(token = %fingerprint(token), "No validation record for token");
                return Err(ApiError::InvalidToken { message: None });
            }
        };

        let validation: TokenValidation = serde_json::from_value(record)
            .map_err(|e| ApiError::backend("validation_failed", e))?;

        if validation.valid != Some(true) {
            let message = validation.error_message.unwrap_or_default();
            debug!(
                token = %fingerprint(token),
                rate_limited = validation.rate_limit_exceeded.unwrap_or(false),
                "Integration token rejected: {}",
                message
            );
            return Err(if validation.rate_limit_exceeded == Some(true) {
                ApiError::RateLimited { message }
            } else {
                ApiError::InvalidToken {
                    message: Some(message),
                }
            });
        }

        let token_id = validation
            .token_id
            .as_ref()
            .and_then(id_text)
            .ok_or_else(|| ApiError::backend("validation_failed", "record has no token_id"))?;
        let user_id = validation
            .user_id
            .as_ref()
            .and_then(id_text)
            .ok_or_else(|| ApiError::backend("validation_failed", "record has no user_id"))?;

        Ok(IntegrationContext { token_id, user_id })
    }
}
