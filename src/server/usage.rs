//! Best-effort usage audit for integration requests.
//!
//! Every request that got past token validation produces one
//! `log_integration_token_usage` call, successful or not. A failing audit
//! call is logged locally and otherwise ignored; it never changes the reply.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use crate::auth::{IntegrationContext, RequestMeta};
use crate::backend::Backend;

/// Stored procedure that records token usage.
pub const LOG_USAGE_RPC: &str = "log_integration_token_usage";

/// One audit entry.
#[derive(Debug)]
pub struct UsageRecord<'a> {
    pub context: &'a IntegrationContext,
    pub meta: &'a RequestMeta,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub payload: Option<&'a Value>,
    pub error_message: Option<&'a str>,
}

impl UsageRecord<'_> {
    fn params(&self) -> Value {
        json!({
            "p_token_id": self.context.token_id,
            "p_endpoint": self.meta.endpoint,
            "p_method": self.meta.method,
            "p_status_code": self.status.as_u16(),
            "p_response_time_ms": u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            "p_ip_address": self.meta.ip_address,
            "p_user_agent": self.meta.user_agent,
            "p_request_payload": self.payload,
            "p_error_message": self.error_message,
        })
    }
}

/// Writes usage entries through the backend.
pub struct UsageLogger<B> {
    backend: Arc<B>,
}

impl<B: Backend> UsageLogger<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Record one entry, swallowing any failure.
    pub async fn record(&self, record: UsageRecord<'_>) {
        if let Err(e) = self.backend.rpc(LOG_USAGE_RPC, record.params()).await {
            warn!(
                token_id = %record.context.token_id,
                endpoint = %record.meta.endpoint,
                "Failed to record token usage: {}",
                e
            );
        }
    }
}
