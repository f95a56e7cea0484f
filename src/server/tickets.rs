//! Ticket handlers for the integration service.
//!
//! Each handler makes exactly one mutating stored procedure call. Creation,
//! comments and status changes then read the affected row back; that read
//! is best-effort and only enriches the reply.

use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use super::body::{id_text, is_truthy, or_default, present};
use super::reply::Reply;
use crate::auth::IntegrationContext;
use crate::backend::{Backend, RowQuery};
use crate::error::ApiError;

pub const CREATE_TICKET_RPC: &str = "create_ticket_via_integration";
pub const ADD_COMMENT_RPC: &str = "add_ticket_comment_via_integration";
pub const UPDATE_STATUS_RPC: &str = "update_ticket_status_via_integration";

/// Priority assigned when the caller sends none.
pub const DEFAULT_PRIORITY: &str = "medium";

const TICKETS_TABLE: &str = "tickets";
const COMMENTS_TABLE: &str = "ticket_comments";

const CREATED_TICKET_COLUMNS: &str =
    "id, title, description, status, priority, category, metadata, created_at";
const TICKET_COLUMNS: &str =
    "id, title, description, status, priority, category, metadata, created_at, updated_at";
const STATUS_COLUMNS: &str = "id, status, updated_at";
const COMMENT_COLUMNS: &str = "id, ticket_id, content, is_internal, created_at";

/// Routes advertised by the health endpoint.
pub const ENDPOINTS: [&str; 4] = [
    "POST /tickets",
    "GET /tickets/:id",
    "POST /tickets/:id/comments",
    "PATCH /tickets/:id/status",
];

/// `GET /`
pub fn health() -> Reply {
    Reply::ok(json!({
        "status": "ok",
        "endpoints": ENDPOINTS,
    }))
}

/// `POST /tickets`
pub async fn create_ticket<B: Backend>(
    backend: &B,
    ctx: &IntegrationContext,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let title = present(body, "title").ok_or_else(|| ApiError::validation("missing_title"))?;

    let params = json!({
        "p_token_id": ctx.token_id,
        "p_user_id": ctx.user_id,
        "p_title": title,
        "p_description": or_default(body, "description", Value::Null),
        "p_priority": or_default(body, "priority", json!(DEFAULT_PRIORITY)),
        "p_category": or_default(body, "category", Value::Null),
        "p_metadata": or_default(body, "metadata", Value::Null),
    });

    let ticket_id = backend
        .rpc(CREATE_TICKET_RPC, params)
        .await
        .map_err(|e| ApiError::backend("create_failed", e))?;
    let Some(id) = id_text(&ticket_id) else {
        warn!("Ticket creation returned no usable id, skipping read-back");
        return Ok(Reply::created(json!({ "id": ticket_id })));
    };

    let query = RowQuery::from(TICKETS_TABLE)
        .select(CREATED_TICKET_COLUMNS)
        .eq("id", id.as_str());

    match backend.fetch_one(&query).await {
        Ok(ticket) => Ok(Reply::created(json!({ "ticket": ticket }))),
        Err(e) => {
            warn!(ticket_id = %id, "Created ticket could not be read back: {}", e);
            Ok(Reply::created(json!({ "id": ticket_id })))
        }
    }
}

/// `GET /tickets/{id}`
///
/// Only tickets created through the caller's own token are visible.
pub async fn get_ticket<B: Backend>(
    backend: &B,
    ctx: &IntegrationContext,
    ticket_id: &str,
) -> Result<Reply, ApiError> {
    let query = RowQuery::from(TICKETS_TABLE)
        .select(TICKET_COLUMNS)
        .eq("id", ticket_id)
        .eq("integration_source", ctx.token_id.as_str());

    match backend.fetch_optional(&query).await {
        Ok(Some(ticket)) => Ok(Reply::ok(json!({ "ticket": ticket }))),
        Ok(None) => Err(ApiError::NotFound {
            code: "not_found",
            message: None,
        }),
        Err(e) => Err(ApiError::backend("fetch_failed", e)),
    }
}

/// `POST /tickets/{id}/comments`
pub async fn add_comment<B: Backend>(
    backend: &B,
    ctx: &IntegrationContext,
    ticket_id: &str,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let content =
        present(body, "content").ok_or_else(|| ApiError::validation("missing_content"))?;

    let params = json!({
        "p_token_id": ctx.token_id,
        "p_user_id": ctx.user_id,
        "p_ticket_id": ticket_id,
        "p_content": content,
        "p_is_internal": or_default(body, "is_internal", json!(false)),
    });

    let comment_id = backend
        .rpc(ADD_COMMENT_RPC, params)
        .await
        .map_err(|e| ApiError::backend("comment_failed", e))?;

    let Some(id) = id_text(&comment_id) else {
        return Ok(Reply::created(json!({ "comment_id": comment_id })));
    };

    let query = RowQuery::from(COMMENTS_TABLE)
        .select(COMMENT_COLUMNS)
        .eq("id", id.as_str());

    match backend.fetch_optional(&query).await {
        Ok(Some(comment)) => Ok(Reply::created(json!({
            "comment_id": comment_id,
            "comment": comment,
        }))),
        Ok(None) => Ok(Reply::created(json!({ "comment_id": comment_id }))),
        Err(e) => {
            warn!(comment_id = %id, "Created comment could not be read back: {}", e);
            Ok(Reply::created(json!({ "comment_id": comment_id })))
        }
    }
}

/// `PATCH /tickets/{id}/status`
///
/// A falsy procedure result means the ticket does not exist or is not
/// owned by the caller's token, answered with 400 `{success: false}`.
pub async fn update_status<B: Backend>(
    backend: &B,
    ctx: &IntegrationContext,
    ticket_id: &str,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let status = present(body, "status").ok_or_else(|| ApiError::validation("missing_status"))?;

    let params = json!({
        "p_token_id": ctx.token_id,
        "p_user_id": ctx.user_id,
        "p_ticket_id": ticket_id,
        "p_status": status,
    });

    let updated = backend
        .rpc(UPDATE_STATUS_RPC, params)
        .await
        .map_err(|e| ApiError::backend("status_failed", e))?;

    if !is_truthy(&updated) {
        return Ok(Reply::new(
            StatusCode::BAD_REQUEST,
            json!({ "success": false }),
        ));
    }

    let query = RowQuery::from(TICKETS_TABLE)
        .select(STATUS_COLUMNS)
        .eq("id", ticket_id);

    match backend.fetch_optional(&query).await {
        Ok(Some(ticket)) => Ok(Reply::ok(json!({ "success": true, "ticket": ticket }))),
        Ok(None) => Ok(Reply::ok(json!({ "success": true }))),
        Err(e) => {
            warn!(ticket_id = %ticket_id, "Updated ticket could not be read back: {}", e);
            Ok(Reply::ok(json!({ "success": true })))
        }
    }
}
