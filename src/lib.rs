//! # Helpdesk Gateway
//!
//! An authenticating request router in front of the helpdesk backend.
//!
//! The backend (stored procedures, row-level data, auth provider) owns all
//! business rules. This crate only authenticates callers, routes requests to
//! the right stored procedure, and shapes JSON replies. It provides two
//! services:
//!
//! - **Ticket integration API**: external systems holding an integration
//!   token create, read, comment on and update tickets. Every authenticated
//!   request is audited through a usage-log procedure.
//! - **User administration API**: administrators invite users, change roles,
//!   toggle accounts, reset passwords and read the activity log.
//!
//! ## Architecture
//!
//! - [`config`] - CLI and configuration types
//! - [`error`] - Backend errors and the [`ApiError`] short-circuit type
//! - [`backend`] - `Backend` / `AuthProvider` ports and the REST adapter
//! - [`auth`] - Bearer parsing and token/session validation
//! - [`router`] - Declarative route tables
//! - [`server`] - Service pipelines, handlers and axum wiring
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use helpdesk_gateway::{create_integration_router, IntegrationService, RestBackend, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = "https://project.example.co".parse()?;
//!     let backend = Arc::new(RestBackend::new(url, "service-key", Duration::from_secs(30))?);
//!
//!     let router = create_integration_router(IntegrationService::new(backend), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod router;
pub mod server;

// Re-export commonly used types
pub use auth::{AdminContext, IntegrationContext, RequestMeta};
pub use backend::{AuthProvider, Backend, Identity, InviteRequest, RestBackend, RowQuery};
pub use config::{Cli, Command, ServeConfig};
pub use error::{ApiError, AuthProviderError, BackendError};
pub use router::{normalize_path, PathParams, RouteMatch, RouteTable};
pub use server::{
    create_admin_router, create_integration_router, AdminService, EmailSettings,
    IntegrationService, Reply, RouterConfig,
};
