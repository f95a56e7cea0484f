//! User administration handlers.
//!
//! Invitations and password resets trigger an email through the auth
//! provider after the stored procedure succeeds. The email outcome is
//! reported in the reply (`email_sent`, `email_error`) and never changes the
//! status code.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::form_urlencoded;

use super::body::{parse_int_prefix, present, present_str};
use super::reply::Reply;
use crate::auth::AdminContext;
use crate::backend::{AuthProvider, Backend, InviteRequest};
use crate::error::ApiError;

pub const CREATE_INVITATION_RPC: &str = "create_user_invitation";
pub const RESEND_INVITATION_RPC: &str = "resend_user_invitation";
pub const BULK_UPDATE_ROLES_RPC: &str = "bulk_update_user_roles";
pub const TOGGLE_STATUS_RPC: &str = "toggle_user_status";
pub const RESET_PASSWORD_RPC: &str = "reset_user_password";
pub const ACTIVITY_LOG_RPC: &str = "get_user_activity_log";

/// Roles an administrator may assign.
pub const VALID_ROLES: [&str; 2] = ["agent", "admin"];

/// Role given to invitees when none is requested.
pub const DEFAULT_ROLE: &str = "agent";

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
pub const DEFAULT_ACTIVITY_OFFSET: i64 = 0;

/// Version reported by the health endpoint.
pub const SERVICE_VERSION: &str = "1.0.0";

/// Routes advertised by the health endpoint.
pub const ENDPOINTS: [&str; 6] = [
    "POST /invitations - Create user invitation",
    "POST /invitations/:id/resend - Resend invitation",
    "POST /users/roles/bulk - Bulk update user roles",
    "PATCH /users/:id/status - Toggle user status",
    "PATCH /users/:id/password - Reset user password",
    "GET /activity-log - Get user activity log",
];

// =============================================================================
// Email
// =============================================================================

/// Addresses used when building account emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    base_url: String,
    sender: String,
}

impl EmailSettings {
    pub fn new(base_url: impl AsRef<str>, sender: impl Into<String>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            sender: sender.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Verification link embedded in invitation emails.
    pub fn invite_redirect(&self, invitation_code: &str) -> String {
        format!(
            "{}/auth/v1/verify?token={}&type=invite&redirect_to={}",
            self.base_url,
            urlencoding::encode(invitation_code),
            urlencoding::encode(&self.base_url)
        )
    }

    /// Landing page for password reset emails.
    pub fn reset_redirect(&self) -> String {
        format!("{}/auth/reset-password", self.base_url)
    }
}

/// Result of a best-effort email send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOutcome {
    pub sent: bool,
    pub error: Option<String>,
}

impl EmailOutcome {
    fn sent() -> Self {
        Self {
            sent: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            sent: false,
            error: Some(error.into()),
        }
    }
}

async fn send_invitation<B: AuthProvider>(
    backend: &B,
    settings: &EmailSettings,
    email: &str,
    role: &str,
    invitation_code: Option<&str>,
) -> EmailOutcome {
    let invite = InviteRequest {
        email: email.to_string(),
        role: role.to_string(),
        invitation_code: invitation_code.map(str::to_string),
        redirect_to: settings.invite_redirect(invitation_code.unwrap_or_default()),
        sender: settings.sender().to_string(),
    };

    match backend.invite_user(&invite).await {
        Ok(()) => {
            info!(email = %email, role = %role, "Invitation email sent");
            EmailOutcome::sent()
        }
        Err(e) => {
            warn!(email = %email, "Invitation email failed: {}", e);
            EmailOutcome::failed(e.to_string())
        }
    }
}

async fn send_password_reset<B: AuthProvider>(
    backend: &B,
    settings: &EmailSettings,
    email: Option<&str>,
) -> EmailOutcome {
    let Some(email) = email else {
        return EmailOutcome::failed("no email address on record");
    };

    match backend
        .send_password_reset(email, &settings.reset_redirect())
        .await
    {
        Ok(()) => {
            info!(email = %email, "Password reset email sent");
            EmailOutcome::sent()
        }
        Err(e) => {
            warn!(email = %email, "Password reset email failed: {}", e);
            EmailOutcome::failed(e.to_string())
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Row returned by the invitation procedures.
#[derive(Debug, Deserialize)]
struct InvitationRecord {
    #[serde(default)]
    invitation_id: Value,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    invitation_code: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    resent_at: Value,
}

/// Row returned by the password reset procedure.
#[derive(Debug, Deserialize)]
struct PasswordResetRecord {
    #[serde(default)]
    user_id: Value,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    reset_at: Value,
}

fn decode<T: serde::de::DeserializeOwned>(rpc: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::internal(format!("unexpected {} result: {}", rpc, e)))
}

fn check_role(role: &Value) -> Result<&str, ApiError> {
    role.as_str()
        .filter(|r| VALID_ROLES.contains(r))
        .ok_or_else(|| ApiError::validation_msg("invalid_role", "Role must be 'agent' or 'admin'"))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /`
pub fn health() -> Reply {
    Reply::ok(json!({
        "status": "ok",
        "service": "user-admin",
        "version": SERVICE_VERSION,
        "endpoints": ENDPOINTS,
    }))
}

/// `POST /invitations`
pub async fn create_invitation<B: Backend + AuthProvider>(
    backend: &B,
    settings: &EmailSettings,
    ctx: &AdminContext,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let email = present_str(body, "email")
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("missing_email"))?;

    let role = match present(body, "role") {
        Some(role) => check_role(role)?,
        None => DEFAULT_ROLE,
    };

    let params = json!({
        "p_email": email,
        "p_role": role,
        "p_invited_by": ctx.user_id,
    });
    let result = backend
        .rpc(CREATE_INVITATION_RPC, params)
        .await
        .map_err(|e| ApiError::backend("invitation_failed", e))?;
    let record: InvitationRecord = decode(CREATE_INVITATION_RPC, result)?;

    let outcome = send_invitation(
        backend,
        settings,
        &email,
        role,
        record.invitation_code.as_deref(),
    )
    .await;

    Ok(Reply::created(json!({
        "success": true,
        "invitation": {
            "id": record.invitation_id,
            "email": record.email.unwrap_or(email),
            "role": record.role.as_deref().unwrap_or(role),
            "created_at": record.created_at,
        },
        "email_sent": outcome.sent,
        "email_error": outcome.error,
    })))
}

/// `POST /invitations/{id}/resend`
pub async fn resend_invitation<B: Backend + AuthProvider>(
    backend: &B,
    settings: &EmailSettings,
    ctx: &AdminContext,
    invitation_id: &str,
) -> Result<Reply, ApiError> {
    let params = json!({
        "p_invitation_id": invitation_id,
        "p_resent_by": ctx.user_id,
    });
    let result = backend
        .rpc(RESEND_INVITATION_RPC, params)
        .await
        .map_err(|e| ApiError::backend("resend_failed", e))?;
    let record: InvitationRecord = decode(RESEND_INVITATION_RPC, result)?;

    // Resent emails always carry the default role; the stored invitation
    // keeps the role it was created with.
    let outcome = match record.email.as_deref() {
        Some(email) => {
            send_invitation(
                backend,
                settings,
                email,
                DEFAULT_ROLE,
                record.invitation_code.as_deref(),
            )
            .await
        }
        None => EmailOutcome::failed("no email address on record"),
    };

    Ok(Reply::ok(json!({
        "success": true,
        "invitation": {
            "id": record.invitation_id,
            "email": record.email,
            "resent_at": record.resent_at,
        },
        "email_sent": outcome.sent,
        "email_error": outcome.error,
    })))
}

/// `POST /users/roles/bulk`
pub async fn bulk_update_roles<B: Backend>(
    backend: &B,
    ctx: &AdminContext,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let user_ids = body
        .and_then(|b| b.get("user_ids"))
        .filter(|ids| ids.is_array())
        .ok_or_else(|| {
            ApiError::validation_msg("missing_user_ids", "user_ids must be an array")
        })?;
    let new_role =
        present(body, "new_role").ok_or_else(|| ApiError::validation("missing_new_role"))?;
    let new_role = check_role(new_role)?;

    let params = json!({
        "p_user_ids": user_ids,
        "p_new_role": new_role,
        "p_updated_by": ctx.user_id,
    });
    let result = backend
        .rpc(BULK_UPDATE_ROLES_RPC, params)
        .await
        .map_err(|e| ApiError::backend("bulk_update_failed", e))?;

    Ok(Reply::ok(json!({ "success": true, "result": result })))
}

/// `PATCH /users/{id}/status`
pub async fn toggle_user_status<B: Backend>(
    backend: &B,
    ctx: &AdminContext,
    user_id: &str,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let is_active = body
        .and_then(|b| b.get("is_active"))
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            ApiError::validation_msg("missing_is_active", "is_active must be a boolean")
        })?;

    let params = json!({
        "p_user_id": user_id,
        "p_is_active": is_active,
        "p_toggled_by": ctx.user_id,
    });
    let result = backend
        .rpc(TOGGLE_STATUS_RPC, params)
        .await
        .map_err(|e| ApiError::backend("toggle_failed", e))?;

    Ok(Reply::ok(json!({ "success": true, "result": result })))
}

/// `PATCH /users/{id}/password`
pub async fn reset_password<B: Backend + AuthProvider>(
    backend: &B,
    settings: &EmailSettings,
    ctx: &AdminContext,
    user_id: &str,
    body: Option<&Value>,
) -> Result<Reply, ApiError> {
    let new_password = present_str(body, "new_password")
        .ok_or_else(|| ApiError::validation("missing_new_password"))?;
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation_msg(
            "password_too_short",
            "Password must be at least 6 characters",
        ));
    }

    let params = json!({
        "p_user_id": user_id,
        "p_new_password": new_password,
        "p_reset_by": ctx.user_id,
    });
    let result = backend
        .rpc(RESET_PASSWORD_RPC, params)
        .await
        .map_err(|e| ApiError::backend("reset_failed", e))?;
    let record: PasswordResetRecord = decode(RESET_PASSWORD_RPC, result)?;

    let outcome = send_password_reset(backend, settings, record.email.as_deref()).await;

    Ok(Reply::ok(json!({
        "success": true,
        "result": {
            "user_id": record.user_id,
            "email": record.email,
            "reset_at": record.reset_at,
        },
        "email_sent": outcome.sent,
        "email_error": outcome.error,
    })))
}

/// `GET /activity-log?limit=&offset=`
///
/// The first occurrence of each key is used. Unparseable or absent values
/// fall back to the defaults; there is no upper bound on `limit`.
pub async fn activity_log<B: Backend>(backend: &B, query: Option<&str>) -> Result<Reply, ApiError> {
    let pairs: Vec<_> = form_urlencoded::parse(query.unwrap_or_default().as_bytes()).collect();
    let first = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| parse_int_prefix(value))
    };

    let limit = first("limit").unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let offset = first("offset").unwrap_or(DEFAULT_ACTIVITY_OFFSET);

    let params = json!({ "p_limit": limit, "p_offset": offset });
    let logs = backend
        .rpc(ACTIVITY_LOG_RPC, params)
        .await
        .map_err(|e| ApiError::backend("fetch_failed", e))?;

    Ok(Reply::ok(json!({
        "success": true,
        "logs": logs,
        "pagination": { "limit": limit, "offset": offset },
    })))
}
