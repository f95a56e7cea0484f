//! Axum wiring for both services.
//!
//! Routing is owned by each service's declarative table, so the axum router
//! is a single fallback handler that hands every request to the service
//! pipeline. Authentication must run before route matching (an unknown path
//! with a bad token is still a 401), which rules out per-route axum
//! handlers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use helpdesk_gateway::server::{create_integration_router, IntegrationService, RouterConfig};
//!
//! let backend = Arc::new(RestBackend::new(url, key, timeout)?);
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://helpdesk.example.com".to_string()]);
//!
//! let router = create_integration_router(IntegrationService::new(backend), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    response::Response,
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::admin::AdminService;
use super::integration::IntegrationService;
use crate::backend::{AuthProvider, Backend};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builders
// =============================================================================

/// Create the router for the ticket integration API.
pub fn create_integration_router<B>(service: IntegrationService<B>, config: RouterConfig) -> Router
where
    B: Backend + 'static,
{
    let router = Router::new()
        .fallback(integration_entry::<B>)
        .with_state(Arc::new(service));

    finish(router, &config)
}

/// Create the router for the user administration API.
pub fn create_admin_router<B>(service: AdminService<B>, config: RouterConfig) -> Router
where
    B: Backend + AuthProvider + 'static,
{
    let router = Router::new()
        .fallback(admin_entry::<B>)
        .with_state(Arc::new(service));

    finish(router, &config)
}

async fn integration_entry<B: Backend + 'static>(
    State(service): State<Arc<IntegrationService<B>>>,
    request: Request,
) -> Response {
    service.handle(request).await
}

async fn admin_entry<B: Backend + AuthProvider + 'static>(
    State(service): State<Arc<AdminService<B>>>,
    request: Request,
) -> Response {
    service.handle(request).await
}

/// Apply CORS and, if enabled, request tracing.
fn finish(router: Router, config: &RouterConfig) -> Router {
    let router = router.layer(build_cors_layer(config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
