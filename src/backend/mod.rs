//! Ports to the managed backend.
//!
//! The gateway never touches storage directly. Everything goes through two
//! traits so the services can run against the real REST backend in
//! production and an in-memory fake in tests:
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────────┐
//! │  IntegrationService  │─────▶│ Backend                      │
//! │  AdminService        │      │   rpc(name, params)          │
//! └──────────┬───────────┘      │   select(RowQuery)           │
//!            │                  └──────────────────────────────┘
//!            │                  ┌──────────────────────────────┐
//!            └─────────────────▶│ AuthProvider                 │
//!                               │   resolve_identity(token)    │
//!                               │   invite_user(InviteRequest) │
//!                               │   send_password_reset(..)    │
//!                               └──────────────────────────────┘
//! ```
//!
//! [`RestBackend`] implements both against PostgREST and GoTrue endpoints.

mod query;
mod rest;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AuthProviderError, BackendError};

pub use query::RowQuery;
pub use rest::RestBackend;

// =============================================================================
// Backend Trait
// =============================================================================

/// Stored procedures and row reads.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Invoke the stored procedure `name` with named parameters.
    ///
    /// The result is whatever JSON the procedure returns (scalar, object,
    /// array or null).
    async fn rpc(&self, name: &str, params: Value) -> Result<Value, BackendError>;

    /// Return every row matching the query.
    async fn select(&self, query: &RowQuery) -> Result<Vec<Value>, BackendError>;

    /// Return exactly one row; zero or several rows is an error.
    async fn fetch_one(&self, query: &RowQuery) -> Result<Value, BackendError> {
        let mut rows = self.select(query).await?;
        if rows.len() != 1 {
            return Err(BackendError::RowCount {
                expected: "exactly one",
                found: rows.len(),
            });
        }
        Ok(rows.remove(0))
    }

    /// Return at most one row; several rows is an error.
    async fn fetch_optional(&self, query: &RowQuery) -> Result<Option<Value>, BackendError> {
        let mut rows = self.select(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows.remove(0))),
            found => Err(BackendError::RowCount {
                expected: "at most one",
                found,
            }),
        }
    }
}

// =============================================================================
// AuthProvider Trait
// =============================================================================

/// A user resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// An invitation email to be sent by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRequest {
    /// Recipient address (already normalized)
    pub email: String,

    /// Role the invitee will receive
    pub role: String,

    /// Code issued by the invitation procedure
    pub invitation_code: Option<String>,

    /// Where the verification link sends the user
    pub redirect_to: String,

    /// Sender address recorded with the invitation
    pub sender: String,
}

/// Session verification and account emails.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user owning a session token.
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthProviderError>;

    /// Send an invitation email.
    async fn invite_user(&self, invite: &InviteRequest) -> Result<(), AuthProviderError>;

    /// Send a password reset email.
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthProviderError>;
}
