use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by the data backend (stored procedures and row queries)
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The stored procedure or query was rejected by the backend
    #[error("{message}")]
    Rpc { message: String },

    /// Backend answered with an unexpected status and no usable message
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Transport(String),

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A single-row query matched the wrong number of rows
    #[error("Expected {expected} row, found {found}")]
    RowCount { expected: &'static str, found: usize },
}

/// Errors raised by the managed auth provider
#[derive(Debug, Clone, Error)]
pub enum AuthProviderError {
    /// The provider refused the request (bad token, unknown user, mail failure)
    #[error("{0}")]
    Rejected(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Transport(String),

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A short-circuit result that terminates request processing.
///
/// Validators and handlers return `Result<_, ApiError>`; the service pipeline
/// renders the error as a JSON body of the form
/// `{"error": code, "message"?: .., "details"?: ..}`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No usable bearer token on the request (401)
    #[error("Missing bearer token")]
    MissingToken { message: Option<String> },

    /// The token was rejected by the remote authority (401)
    #[error("Invalid token")]
    InvalidToken { message: Option<String> },

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {message}")]
    Forbidden { code: &'static str, message: String },

    /// The integration token exceeded its quota (429)
    #[error("Rate limit exceeded")]
    RateLimited { message: String },

    /// Request body or parameters failed validation (400)
    #[error("Invalid request: {code}")]
    Validation {
        code: &'static str,
        message: Option<String>,
    },

    /// The primary backend call failed (500)
    #[error("Backend call failed ({code}): {details}")]
    Backend { code: &'static str, details: String },

    /// No route or no row (404)
    #[error("Not found: {code}")]
    NotFound {
        code: &'static str,
        message: Option<String>,
    },

    /// Anything unexpected (500)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Field validation failure without a message.
    pub fn validation(code: &'static str) -> Self {
        ApiError::Validation {
            code,
            message: None,
        }
    }

    /// Field validation failure with a human readable message.
    pub fn validation_msg(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            code,
            message: Some(message.into()),
        }
    }

    /// Primary backend call failure, carrying the backend's message as details.
    pub fn backend(code: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Backend {
            code,
            details: err.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken { .. } | ApiError::InvalidToken { .. } => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Backend { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable snake_case error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingToken { .. } => "missing_token",
            ApiError::InvalidToken { .. } => "invalid_token",
            ApiError::RateLimited { .. } => "rate_limit_exceeded",
            ApiError::Internal { .. } => "internal_error",
            ApiError::Forbidden { code, .. }
            | ApiError::Validation { code, .. }
            | ApiError::Backend { code, .. }
            | ApiError::NotFound { code, .. } => code,
        }
    }

    /// JSON body for this error.
    ///
    /// Internal errors never expose their message to the client.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::from(self.code()));

        let message = match self {
            ApiError::MissingToken { message }
            | ApiError::InvalidToken { message }
            | ApiError::Validation { message, .. }
            | ApiError::NotFound { message, .. } => message.clone(),
            ApiError::Forbidden { message, .. } | ApiError::RateLimited { message } => {
                Some(message.clone())
            }
            ApiError::Backend { .. } | ApiError::Internal { .. } => None,
        };
        if let Some(message) = message {
            body.insert("message".to_string(), Value::from(message));
        }

        if let ApiError::Backend { details, .. } = self {
            body.insert("details".to_string(), Value::from(details.as_str()));
        }

        Value::Object(body)
    }

    /// Expose an internal error's message to the caller as `details`.
    ///
    /// The admin API reports unexpected failures this way; other errors are
    /// returned unchanged.
    pub fn with_internal_details(self) -> Self {
        match self {
            ApiError::Internal { message } => ApiError::Backend {
                code: "internal_error",
                details: message,
            },
            other => other,
        }
    }

    /// Message recorded in the usage audit log, set only for internal errors.
    pub fn audit_message(&self) -> Option<&str> {
        match self {
            ApiError::Internal { message } => Some(message),
            _ => None,
        }
    }
}
