//! Administrator session validation.
//!
//! An admin request is authorized in three steps:
//!
//! ```text
//! session token ──▶ AuthProvider::resolve_identity ──▶ 401 invalid_token
//!                              │
//!                              ▼
//!              profiles(role, email, full_name) ────▶ 403 profile_not_found
//!                              │
//!                              ▼
//!                       role == "admin" ─────────────▶ 403 insufficient_permissions
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::token::fingerprint;
use crate::backend::{AuthProvider, Backend, RowQuery};
use crate::error::ApiError;

/// Profile role that grants access to the admin API.
pub const ADMIN_ROLE: &str = "admin";

/// Identity attached to a request from a verified administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_role: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Validates administrator session tokens.
pub struct AdminValidator<B> {
    backend: Arc<B>,
}

impl<B: Backend + AuthProvider> AdminValidator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Resolve and authorize the caller behind `token`.
    pub async fn validate(&self, token: &str) -> Result<AdminContext, ApiError> {
        let identity = self.backend.resolve_identity(token).await.map_err(|e| {
            debug!(token = %fingerprint(token), "Session token rejected: {}", e);
            ApiError::InvalidToken {
                message: Some("Authentication failed".to_string()),
            }
        })?;

        let query = RowQuery::from("profiles")
            .select("role, email, full_name")
            .eq("id", identity.id.as_str());

        let profile_not_found = || ApiError::Forbidden {
            code: "profile_not_found",
            message: "User profile not found".to_string(),
        };

        let row = self.backend.fetch_one(&query).await.map_err(|e| {
            warn!(user_id = %identity.id, "Profile lookup failed: {}", e);
            profile_not_found()
        })?;
        let profile: Profile = serde_json::from_value(row).map_err(|_| profile_not_found())?;

        let role = profile.role.unwrap_or_default();
        if role != ADMIN_ROLE {
            warn!(user_id = %identity.id, role = %role, "Non-admin attempted admin access");
            return Err(ApiError::Forbidden {
                code: "insufficient_permissions",
                message: "Admin role required".to_string(),
            });
        }

        Ok(AdminContext {
            user_id: identity.id,
            user_email: profile.email,
            user_role: role,
        })
    }
}
