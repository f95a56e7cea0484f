//! Caller authentication and authorization.
//!
//! - [`token`] extracts the bearer token from the `Authorization` header
//! - [`integration`] checks integration tokens through a stored procedure
//! - [`admin`] resolves a session and requires the `admin` profile role
//!
//! Every check is remote; the gateway keeps no credential state.

pub mod admin;
pub mod integration;
pub mod token;

pub use admin::{AdminContext, AdminValidator, ADMIN_ROLE};
pub use integration::{IntegrationContext, IntegrationValidator, RequestMeta, VALIDATE_TOKEN_RPC};
pub use token::{fingerprint, parse_bearer_token};
