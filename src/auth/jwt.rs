//! Session tokens
//!
//! HS256 tokens carrying the user id, email and the role at issue time. The
//! role claim is informational: authorization always re-reads the user
//! record, so a demoted admin loses rights immediately.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{Role, User};
use crate::types::{ReporterError, Result};

/// Minimum accepted secret length outside dev mode
pub const MIN_SECRET_LEN: usize = 32;

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Outcome of checking a presented token
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into the caller's user id or an `Unauthorized` error
    pub fn into_subject(self) -> Result<String> {
        match self.claims {
            Some(claims) if self.valid => Ok(claims.sub),
            _ => Err(ReporterError::Unauthorized(
                self.error.unwrap_or_else(|| "Invalid token".into()),
            )),
        }
    }
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Production validator; rejects empty or short secrets
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(ReporterError::Config(
                "JWT_SECRET is required unless DEV_MODE is set".into(),
            ));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ReporterError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Fixed, publicly known secret. Dev mode and tests only.
    pub fn new_dev() -> Self {
        Self {
            secret: "ireporter-dev-secret-do-not-use-in-production".into(),
            expiry_seconds: 86_400,
        }
    }

    /// Same secret, different token lifetime
    pub fn with_expiry(mut self, expiry_seconds: u64) -> Self {
        self.expiry_seconds = expiry_seconds;
        self
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Issue a token for a user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = unix_now()?;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(self.expiry_seconds),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ReporterError::Auth(format!("Failed to issue token: {}", e)))
    }

    /// Verify signature and expiry
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => TokenValidationResult::valid(data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token has expired",
                    ErrorKind::InvalidSignature => "Invalid token signature",
                    _ => "Invalid token",
                };
                TokenValidationResult::invalid(msg)
            }
        }
    }
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ReporterError::Auth(format!("System clock before epoch: {}", e)))
}

/// Pull a bearer token out of an `Authorization` header value
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
