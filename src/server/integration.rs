//! Ticket integration service.
//!
//! # Request Pipeline
//!
//! ```text
//! request
//!   │
//!   ├─ bearer token? ───────── no ──▶ 401 missing_token     (not audited)
//!   ├─ validate_integration_token ──▶ 401 / 429 / 500       (not audited)
//!   ├─ read + parse JSON body (non-GET/HEAD, failures become "no body")
//!   ├─ route table ─────────── no ──▶ 404 not_found
//!   ├─ handler ───────────────────▶ reply or ApiError
//!   └─ log_integration_token_usage (best-effort, every outcome)
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use super::body::{parse_json, read_body};
use super::reply::Reply;
use super::tickets;
use super::usage::{UsageLogger, UsageRecord};
use crate::auth::{parse_bearer_token, IntegrationContext, IntegrationValidator, RequestMeta};
use crate::backend::Backend;
use crate::error::ApiError;
use crate::router::{normalize_path, RouteTable};

/// Default limit on request body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// Routes
// =============================================================================

/// Operations of the integration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationEndpoint {
    Health,
    CreateTicket,
    MissingTicketId,
    GetTicket,
    AddComment,
    UpdateStatus,
    Unsupported,
}

/// Route table of the integration API, in match order.
///
/// Ticket paths are resolved on their first three segments after
/// `/tickets`: id, sub-resource and action. An empty sub-resource counts as
/// absent, and segments past the sub-resource are ignored for comments and
/// status. Only a non-empty action under an unknown pairing is
/// `unsupported_route`.
pub fn integration_routes() -> RouteTable<IntegrationEndpoint> {
    use IntegrationEndpoint::*;

    RouteTable::new()
        .route(Method::GET, "/", Health)
        .route(Method::POST, "/tickets", CreateTicket)
        .any("/tickets/{id:empty}/{*rest}", MissingTicketId)
        .route(Method::GET, "/tickets/{id}", GetTicket)
        .route(Method::GET, "/tickets/{id}/{sub:empty}/{*rest?}", GetTicket)
        .route(Method::POST, "/tickets/{id}/comments/{*rest?}", AddComment)
        .route(Method::PATCH, "/tickets/{id}/status/{*rest?}", UpdateStatus)
        .any("/tickets/{id}/{sub}/{action}/{*rest?}", Unsupported)
}

// =============================================================================
// Service
// =============================================================================

/// The integration API over a backend.
pub struct IntegrationService<B: Backend> {
    backend: Arc<B>,
    validator: IntegrationValidator<B>,
    usage: UsageLogger<B>,
    routes: RouteTable<IntegrationEndpoint>,
    max_body_bytes: usize,
}

impl<B: Backend> IntegrationService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            validator: IntegrationValidator::new(Arc::clone(&backend)),
            usage: UsageLogger::new(Arc::clone(&backend)),
            backend,
            routes: integration_routes(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Set the maximum accepted request body size.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Run one request through the full pipeline.
    pub async fn handle(&self, request: Request) -> Response {
        let started = Instant::now();
        let (parts, body) = request.into_parts();
        let endpoint = normalize_path(parts.uri.path());

        let Some(token) = parse_bearer_token(&parts.headers) else {
            return ApiError::MissingToken { message: None }.into_response();
        };

        let meta = RequestMeta::from_request(&parts.method, &endpoint, &parts.headers);
        let context = match self.validator.validate(&token, &meta).await {
            Ok(context) => context,
            Err(e) => return e.into_response(),
        };

        let payload = if parts.method == Method::GET || parts.method == Method::HEAD {
            None
        } else {
            match read_body(body, self.max_body_bytes).await {
                Ok(bytes) => parse_json(&bytes),
                Err(e) => {
                    debug!(endpoint = %endpoint, "Request body unreadable, treating as empty: {}", e);
                    None
                }
            }
        };

        let outcome = self
            .dispatch(&parts.method, &endpoint, &context, payload.as_ref())
            .await;

        let (status, error_message) = match &outcome {
            Ok(reply) => (reply.status, None),
            Err(e) => (e.status(), e.audit_message()),
        };
        let elapsed = started.elapsed();

        self.usage
            .record(UsageRecord {
                context: &context,
                meta: &meta,
                status,
                elapsed,
                payload: payload.as_ref(),
                error_message,
            })
            .await;

        debug!(
            method = %parts.method,
            endpoint = %endpoint,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Integration request handled"
        );

        match outcome {
            Ok(reply) => reply.into_response(),
            Err(e) => e.into_response(),
        }
    }

    /// Resolve the route and run its handler.
    pub async fn dispatch(
        &self,
        method: &Method,
        endpoint: &str,
        context: &IntegrationContext,
        body: Option<&Value>,
    ) -> Result<Reply, ApiError> {
        let matched = self
            .routes
            .match_route(method, endpoint)
            .ok_or(ApiError::NotFound {
                code: "not_found",
                message: None,
            })?;
        let ticket_id = matched.params.get("id").unwrap_or_default();
        let backend = self.backend.as_ref();

        match matched.endpoint {
            IntegrationEndpoint::Health => Ok(tickets::health()),
            IntegrationEndpoint::CreateTicket => {
                tickets::create_ticket(backend, context, body).await
            }
            IntegrationEndpoint::MissingTicketId => Err(ApiError::validation("missing_ticket_id")),
            IntegrationEndpoint::GetTicket => tickets::get_ticket(backend, context, ticket_id).await,
            IntegrationEndpoint::AddComment => {
                tickets::add_comment(backend, context, ticket_id, body).await
            }
            IntegrationEndpoint::UpdateStatus => {
                tickets::update_status(backend, context, ticket_id, body).await
            }
            IntegrationEndpoint::Unsupported => Err(ApiError::NotFound {
                code: "unsupported_route",
                message: None,
            }),
        }
    }
}
