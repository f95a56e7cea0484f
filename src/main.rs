//! Helpdesk gateway - authenticating router for the helpdesk APIs.
//!
//! This binary starts one of the two HTTP services and wires the backend
//! client into it.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_gateway::{
    backend::RestBackend,
    config::{Cli, Command, ServeConfig},
    server::{
        create_admin_router, create_integration_router, AdminService, EmailSettings,
        IntegrationService, RouterConfig,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Integration(config) => run_serve(Service::Integration, config).await,
        Command::Admin(config) => run_serve(Service::Admin, config).await,
    }
}

#[derive(Debug, Clone, Copy)]
enum Service {
    Integration,
    Admin,
}

impl Service {
    fn name(self) -> &'static str {
        match self {
            Service::Integration => "ticket integration API",
            Service::Admin => "user administration API",
        }
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(service: Service, config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let backend_url = match config.parsed_backend_url() {
        Ok(url) => url,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "helpdesk-gateway v{} - {}",
        env!("CARGO_PKG_VERSION"),
        service.name()
    );
    info!("Configuration:");
    info!("  Backend: {}", backend_url);
    info!("  Request timeout: {}s", config.request_timeout_secs);
    info!("  Max body size: {} bytes", config.max_body_bytes);
    match &config.cors_origins {
        Some(origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let backend = match RestBackend::new(
        backend_url.clone(),
        config.service_key.clone(),
        config.request_timeout(),
    ) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("Failed to build backend client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router_config = build_router_config(&config);
    let router = match service {
        Service::Integration => {
            let service =
                IntegrationService::new(backend).with_max_body_bytes(config.max_body_bytes);
            create_integration_router(service, router_config)
        }
        Service::Admin => {
            info!("  Sender email: {}", config.sender_email);
            let settings = EmailSettings::new(backend_url.as_str(), config.sender_email.clone());
            let service =
                AdminService::new(backend, settings).with_max_body_bytes(config.max_body_bytes);
            create_admin_router(service, router_config)
        }
    };

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "helpdesk_gateway=debug,tower_http=debug"
    } else {
        "helpdesk_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    match &config.cors_origins {
        Some(origins) => router_config.with_cors_origins(origins.clone()),
        None => router_config.with_cors_any_origin(),
    }
}
