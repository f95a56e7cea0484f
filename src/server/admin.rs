//! User administration service.
//!
//! # Request Pipeline
//!
//! ```text
//! request
//!   │
//!   ├─ bearer token? ──────── no ──▶ 401 missing_token
//!   ├─ resolve session + profile ──▶ 401 invalid_token / 403
//!   ├─ read + parse JSON body (non-GET/HEAD) ──▶ 400 invalid_json
//!   ├─ route table ────────── no ──▶ 404 not_found
//!   └─ handler ──────────────────▶ reply or ApiError
//! ```
//!
//! Unlike the integration service, an unparseable body is rejected outright.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use super::body::{parse_json, read_body};
use super::integration::DEFAULT_MAX_BODY_BYTES;
use super::reply::Reply;
use super::users::{self, EmailSettings};
use crate::auth::{parse_bearer_token, AdminContext, AdminValidator};
use crate::backend::{AuthProvider, Backend};
use crate::error::ApiError;
use crate::router::{normalize_path, RouteTable};

// =============================================================================
// Routes
// =============================================================================

/// Operations of the user administration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminEndpoint {
    Health,
    CreateInvitation,
    ResendInvitation,
    BulkUpdateRoles,
    ToggleUserStatus,
    ResetPassword,
    ActivityLog,
}

/// Route table of the admin API, in match order.
pub fn admin_routes() -> RouteTable<AdminEndpoint> {
    use AdminEndpoint::*;

    RouteTable::new()
        .route(Method::GET, "/", Health)
        .route(Method::POST, "/invitations", CreateInvitation)
        .route(Method::POST, "/invitations/{id:hex}/resend", ResendInvitation)
        .route(Method::POST, "/users/roles/bulk", BulkUpdateRoles)
        .route(Method::PATCH, "/users/{id:hex}/status", ToggleUserStatus)
        .route(Method::PATCH, "/users/{id:hex}/password", ResetPassword)
        .route(Method::GET, "/activity-log", ActivityLog)
}

// =============================================================================
// Service
// =============================================================================

/// The user administration API over a backend.
pub struct AdminService<B> {
    backend: Arc<B>,
    validator: AdminValidator<B>,
    settings: EmailSettings,
    routes: RouteTable<AdminEndpoint>,
    max_body_bytes: usize,
}

impl<B: Backend + AuthProvider> AdminService<B> {
    pub fn new(backend: Arc<B>, settings: EmailSettings) -> Self {
        Self {
            validator: AdminValidator::new(Arc::clone(&backend)),
            backend,
            settings,
            routes: admin_routes(),
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
        match self.process(request).await {
            Ok(reply) => reply.into_response(),
            Err(e) => e.with_internal_details().into_response(),
        }
    }

    async fn process(&self, request: Request) -> Result<Reply, ApiError> {
        let (parts, body) = request.into_parts();
        let endpoint = normalize_path(parts.uri.path());

        let token = parse_bearer_token(&parts.headers).ok_or_else(|| ApiError::MissingToken {
            message: Some("Authorization header required".to_string()),
        })?;
        let context = self.validator.validate(&token).await?;

        let payload = if parts.method == Method::GET || parts.method == Method::HEAD {
            None
        } else {
            let bytes = read_body(body, self.max_body_bytes).await.map_err(|e| {
                debug!(endpoint = %endpoint, "Request body unreadable: {}", e);
                ApiError::validation("invalid_json")
            })?;
            Some(parse_json(&bytes).ok_or_else(|| ApiError::validation("invalid_json"))?)
        };

        debug!(
            method = %parts.method,
            endpoint = %endpoint,
            admin = %context.user_id,
            "Admin request authorized"
        );

        self.dispatch(
            &parts.method,
            &endpoint,
            parts.uri.query(),
            &context,
            payload.as_ref(),
        )
        .await
    }

    /// Resolve the route and run its handler.
    pub async fn dispatch(
        &self,
        method: &Method,
        endpoint: &str,
        query: Option<&str>,
        context: &AdminContext,
        body: Option<&Value>,
    ) -> Result<Reply, ApiError> {
        let matched = self
            .routes
            .match_route(method, endpoint)
            .ok_or_else(|| ApiError::NotFound {
                code: "not_found",
                message: Some("Endpoint not found".to_string()),
            })?;
        let id = matched.params.get("id").unwrap_or_default();
        let backend = self.backend.as_ref();
        let settings = &self.settings;

        match matched.endpoint {
            AdminEndpoint::Health => Ok(users::health()),
            AdminEndpoint::CreateInvitation => {
                users::create_invitation(backend, settings, context, body).await
            }
            AdminEndpoint::ResendInvitation => {
                users::resend_invitation(backend, settings, context, id).await
            }
            AdminEndpoint::BulkUpdateRoles => {
                users::bulk_update_roles(backend, context, body).await
            }
            AdminEndpoint::ToggleUserStatus => {
                users::toggle_user_status(backend, context, id, body).await
            }
            AdminEndpoint::ResetPassword => {
                users::reset_password(backend, settings, context, id, body).await
            }
            AdminEndpoint::ActivityLog => users::activity_log(backend, query).await,
        }
    }
}
