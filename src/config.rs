//! Configuration for the gateway binary.
//!
//! Configuration comes from command-line arguments via clap, with every
//! option also readable from a `HELPDESK_` environment variable.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use helpdesk_gateway::config::{Cli, Command};
//!
//! match Cli::parse().command {
//!     Command::Integration(config) => println!("tickets on {}", config.bind_address()),
//!     Command::Admin(config) => println!("admin on {}", config.bind_address()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `HELPDESK_HOST` - Server bind address (default: 0.0.0.0)
//! - `HELPDESK_PORT` - Server port (default: 3000)
//! - `HELPDESK_BACKEND_URL` - Base URL of the backend project (required)
//! - `HELPDESK_SERVICE_KEY` - Backend service credential (required)
//! - `HELPDESK_SENDER_EMAIL` - Sender recorded on account emails (default: noreply@example.com)
//! - `HELPDESK_REQUEST_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `HELPDESK_MAX_BODY_BYTES` - Largest accepted request body (default: 1 MiB)
//! - `HELPDESK_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::server::DEFAULT_MAX_BODY_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default sender address for account emails.
pub const DEFAULT_SENDER_EMAIL: &str = "noreply@example.com";

/// Default backend request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI
// =============================================================================

/// Helpdesk gateway - authenticating router for the helpdesk APIs.
///
/// Serves either the ticket integration API (for external integrations
/// holding an integration token) or the user administration API (for
/// administrators holding a session token).
#[derive(Parser, Debug, Clone)]
#[command(name = "helpdesk-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Which service to run.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the ticket integration API.
    Integration(ServeConfig),

    /// Serve the user administration API.
    Admin(ServeConfig),
}

/// Options shared by both services.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HELPDESK_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "HELPDESK_PORT")]
    pub port: u16,

    /// Largest request body accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "HELPDESK_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    /// Base URL of the backend project (e.g. https://xyz.example.co).
    #[arg(long, env = "HELPDESK_BACKEND_URL")]
    pub backend_url: String,

    /// Service credential sent to the backend on every call.
    #[arg(long, env = "HELPDESK_SERVICE_KEY", hide_env_values = true)]
    pub service_key: String,

    /// Timeout for a single backend request, in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "HELPDESK_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    // =========================================================================
    // Email Configuration
    // =========================================================================
    /// Sender address recorded on invitation emails.
    #[arg(long, default_value = DEFAULT_SENDER_EMAIL, env = "HELPDESK_SENDER_EMAIL")]
    pub sender_email: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "HELPDESK_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.parsed_backend_url()?;

        if self.service_key.trim().is_empty() {
            return Err(
                "Service key is required. Set --service-key or HELPDESK_SERVICE_KEY".to_string(),
            );
        }

        if self.sender_email.trim().is_empty() {
            return Err("sender_email must not be empty".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Parse the backend URL, requiring an http or https scheme.
    pub fn parsed_backend_url(&self) -> Result<Url, String> {
        let url = Url::parse(&self.backend_url).map_err(|e| {
            format!(
                "Invalid backend URL '{}': {}. Set --backend-url or HELPDESK_BACKEND_URL",
                self.backend_url, e
            )
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(format!(
                "Backend URL must use http or https, got '{}'",
                other
            )),
        }
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Backend request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
