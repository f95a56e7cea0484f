//! JSON reply shaping shared by both services.
//!
//! Every response leaves the gateway as pretty-printed JSON with
//! `content-type: application/json` and an `x-powered-by` marker, whether it
//! is a handler result or a short-circuit [`ApiError`].

use axum::{
    http::{
        header::{HeaderName, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::ApiError;

/// Value of the `x-powered-by` header.
pub const POWERED_BY: &str = "helpdesk-gateway";

static X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Status code plus JSON body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 OK
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 201 Created
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }
}

impl From<ApiError> for Reply {
    fn from(err: ApiError) -> Self {
        Reply::new(err.status(), err.body())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec_pretty(&self.body) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize reply body: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        (
            self.status,
            [
                (CONTENT_TYPE, "application/json"),
                (X_POWERED_BY.clone(), POWERED_BY),
            ],
            body,
        )
            .into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            error!(
                error_type = code,
                status = status.as_u16(),
                "Request failed: {}",
                self
            );
        } else if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            warn!(
                error_type = code,
                status = status.as_u16(),
                "Request denied: {}",
                self
            );
        } else {
            debug!(
                error_type = code,
                status = status.as_u16(),
                "Request rejected: {}",
                self
            );
        }

        Reply::from(self).into_response()
    }
}
