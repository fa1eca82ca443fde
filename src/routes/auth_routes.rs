//! Account endpoints
//!
//! - `POST /api/users/register` - create an account and log straight in
//! - `POST /api/users/login` - exchange credentials for a token
//! - `GET /api/users/me` - the caller's profile
//!
//! Register and login both claim anonymous reports filed under the
//! account's email and report how many were linked.

use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

use crate::model::UserView;
use crate::routes::response::{authenticate, json_response, parse_json_body, BoxBody, BoxError};
use crate::server::AppState;
use crate::services::users::{LoginRequest, RegisterRequest};
use crate::services::AuthOutcome;
use crate::types::Result;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserView,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_login: Option<bool>,
    pub linked_incidents: u64,
}

fn with_linked(message: &str, linked: u64) -> String {
    if linked > 0 {
        format!(
            "{}. {} anonymous incident(s) linked to your account",
            message, linked
        )
    } else {
        message.to_string()
    }
}

/// POST /api/users/register
pub async fn register<B>(state: &AppState, req: Request<B>) -> Result<Response<BoxBody>>
where
    B: hyper::body::Body,
    B::Error: Into<BoxError>,
{
    let body: RegisterRequest = parse_json_body(req, state.args.max_body_bytes).await?;
    let AuthOutcome {
        user,
        token,
        linked_incidents,
    } = state.services.users.register(&body).await?;

    let message = if user.is_admin {
        "Admin user registered and logged in successfully"
    } else {
        "User registered and logged in successfully"
    };

    Ok(json_response(
        &state.cors_origin,
        StatusCode::CREATED,
        &AuthResponse {
            message: with_linked(message, linked_incidents),
            user,
            token,
            auto_login: Some(true),
            linked_incidents,
        },
    ))
}

/// POST /api/users/login
pub async fn login<B>(state: &AppState, req: Request<B>) -> Result<Response<BoxBody>>
where
    B: hyper::body::Body,
    B::Error: Into<BoxError>,
{
    let body: LoginRequest = parse_json_body(req, state.args.max_body_bytes).await?;
    let AuthOutcome {
        user,
        token,
        linked_incidents,
    } = state.services.users.login(&body).await?;

    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &AuthResponse {
            message: with_linked("Login successful", linked_incidents),
            user,
            token,
            auto_login: None,
            linked_incidents,
        },
    ))
}

/// GET /api/users/me
pub async fn me(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let profile = state.services.users.me(&caller).await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &profile))
}
