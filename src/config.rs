//! Configuration for iReporter
//!
//! CLI arguments with environment fallbacks. `.env` is loaded by the
//! binaries before parsing.

use clap::{Args as ClapArgs, Parser};
use std::net::SocketAddr;

use crate::auth::jwt::{JwtValidator, MIN_SECRET_LEN};
use crate::types::{ReporterError, Result};

/// iReporter - red flag and intervention reporting backend
#[derive(Parser, Debug, Clone)]
#[command(name = "ireporter")]
#[command(about = "Incident reporting backend for red flags and interventions")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5001")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub mongo: MongoArgs,

    /// Development mode: fall back to in-memory stores when MongoDB is
    /// unreachable, allow a missing JWT secret
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token signing (required outside dev mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Value for Access-Control-Allow-Origin
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Largest accepted request body
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

/// MongoDB connection settings, shared with the admin CLI
#[derive(ClapArgs, Debug, Clone)]
pub struct MongoArgs {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "ireporter")]
    pub mongodb_db: String,
}

impl Args {
    /// Check option combinations before anything starts
    pub fn validate(&self) -> Result<()> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err(ReporterError::Config(
                        "JWT_SECRET is required unless DEV_MODE is set".into(),
                    ))
                }
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(ReporterError::Config(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_SECRET_LEN
                    )))
                }
                Some(_) => {}
            }
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(ReporterError::Config(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            )));
        }

        if self.jwt_expiry_seconds == 0 {
            return Err(ReporterError::Config("JWT_EXPIRY_SECONDS must be positive".into()));
        }

        if self.max_body_bytes == 0 {
            return Err(ReporterError::Config("MAX_BODY_BYTES must be positive".into()));
        }

        Ok(())
    }

    /// Token validator for this configuration. Dev mode without a secret
    /// gets the fixed development secret.
    pub fn jwt_validator(&self) -> Result<JwtValidator> {
        match self.jwt_secret.clone() {
            Some(secret) if !secret.is_empty() => {
                JwtValidator::new(secret, self.jwt_expiry_seconds)
            }
            _ if self.dev_mode => {
                Ok(JwtValidator::new_dev().with_expiry(self.jwt_expiry_seconds))
            }
            _ => Err(ReporterError::Config(
                "JWT_SECRET is required unless DEV_MODE is set".into(),
            )),
        }
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}
