//! Response and request helpers shared by every route

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::{extract_token_from_header, JwtValidator};
use crate::types::{ReporterError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

fn with_cors(mut response: Response<BoxBody>, origin: &HeaderValue) -> Response<BoxBody> {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

pub fn json_response<T: Serialize>(
    origin: &HeaderValue,
    status: StatusCode,
    body: &T,
) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        error!("Failed to serialize response: {}", e);
        "{}".to_string()
    });

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_cors(response, origin)
}

/// JSON error body. Server-side failures are logged in full and reported
/// to the client without internals.
pub fn error_response(origin: &HeaderValue, err: &ReporterError) -> Response<BoxBody> {
    let status = err.status_code();
    let message = if err.is_client_error() {
        err.to_string()
    } else {
        error!(code = err.code(), "Request failed: {}", err);
        match err {
            ReporterError::Database(_) => "Database unavailable".to_string(),
            _ => "Internal server error".to_string(),
        }
    };

    json_response(
        origin,
        status,
        &ErrorResponse {
            error: message,
            code: err.code(),
        },
    )
}

pub fn cors_preflight(origin: &HeaderValue) -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    with_cors(response, origin)
}

pub fn not_found_response(origin: &HeaderValue, path: &str) -> Response<BoxBody> {
    json_response(
        origin,
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "code": "NOT_FOUND",
            "path": path,
        }),
    )
}

/// Read and decode a JSON body of at most `max_bytes`
pub async fn parse_json_body<B, T>(req: Request<B>, max_bytes: usize) -> Result<T>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let collected = Limited::new(req.into_body(), max_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                ReporterError::validation("Request body too large")
            } else {
                warn!("Failed to read request body: {}", e);
                ReporterError::validation("Failed to read request body")
            }
        })?;

    let bytes = collected.to_bytes();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ReporterError::validation("No data provided"));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Verified user id from the `Authorization: Bearer` header
pub fn authenticate(headers: &HeaderMap, jwt: &JwtValidator) -> Result<String> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = extract_token_from_header(header)
        .ok_or_else(|| ReporterError::Unauthorized("Missing authorization token".into()))?;
    jwt.verify_token(token).into_subject()
}
