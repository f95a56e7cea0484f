//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                             │
//! │        axum fallback ──▶ service.handle(request)                │
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ integration  │  │    admin     │  │        routes         │  │
//! │  │  (pipeline)  │  │  (pipeline)  │  │  (router, CORS, trace)│  │
//! │  └──────┬───────┘  └──────┬───────┘  └───────────────────────┘  │
//! │         │                 │                                     │
//! │  ┌──────▼───────┐  ┌──────▼───────┐  ┌──────────┐ ┌──────────┐  │
//! │  │   tickets    │  │    users     │  │  reply   │ │  usage   │  │
//! │  │  (handlers)  │  │  (handlers)  │  │  (JSON)  │ │ (audit)  │  │
//! │  └──────────────┘  └──────────────┘  └──────────┘ └──────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod body;
pub mod integration;
pub mod reply;
pub mod routes;
pub mod tickets;
pub mod usage;
pub mod users;

pub use admin::{admin_routes, AdminEndpoint, AdminService};
pub use integration::{
    integration_routes, IntegrationEndpoint, IntegrationService, DEFAULT_MAX_BODY_BYTES,
};
pub use reply::{Reply, POWERED_BY};
pub use routes::{create_admin_router, create_integration_router, RouterConfig};
pub use usage::{UsageLogger, UsageRecord, LOG_USAGE_RPC};
pub use users::{EmailOutcome, EmailSettings};
