//! Service banner, health and version endpoints
//!
//! - `/` - service banner with record counts and the endpoint list
//! - `/health`, `/api/health` - liveness plus a MongoDB round-trip when
//!   persistent storage is in use; 503 when the database does not answer
//! - `/version` - build metadata captured by build.rs

use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::model::IncidentFilter;
use crate::routes::response::{json_response, BoxBody};
use crate::server::AppState;

const SERVICE_NAME: &str = "iReporter API";

#[derive(Debug, Serialize)]
pub struct RecordCounts {
    pub users: u64,
    pub incidents: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
    pub storage: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RecordCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub git_commit_full: &'static str,
    pub build_timestamp: &'static str,
}

async fn record_counts(state: &AppState) -> Option<RecordCounts> {
    let users = state.services.users.count();
    let incidents = state.services.incidents.count(IncidentFilter::all());
    match tokio::join!(users, incidents) {
        (Ok(users), Ok(incidents)) => Some(RecordCounts { users, incidents }),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to count records: {}", e);
            None
        }
    }
}

/// GET /
pub async fn service_info(state: &AppState) -> Response<BoxBody> {
    let body = serde_json::json!({
        "message": "iReporter Backend API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage(),
        "stats": record_counts(state).await,
        "endpoints": {
            "health": "GET /health",
            "version": "GET /version",
            "register": "POST /api/users/register",
            "login": "POST /api/users/login",
            "profile": "GET /api/users/me",
            "incidents": "GET/POST /api/incidents",
            "anonymous_report": "POST /api/incidents/anonymous",
            "incident_stats": "GET /api/incidents/stats",
            "incident_detail": "GET/PUT/DELETE /api/incidents/:id",
            "incident_status": "PATCH /api/incidents/:id/status",
            "notifications": "GET /api/notifications",
            "mark_read": "PUT /api/notifications/:id/read",
            "mark_all_read": "PUT /api/notifications/read-all",
            "admin_users": "GET /api/admin/users",
            "admin_user_role": "PATCH /api/admin/users/:id/role",
        },
    });
    json_response(&state.cors_origin, StatusCode::OK, &body)
}

/// GET /health
pub async fn health_check(state: &AppState) -> Response<BoxBody> {
    let db_error = match &state.mongo {
        Some(mongo) => mongo.ping().await.err().map(|e| e.to_string()),
        None => None,
    };
    let healthy = db_error.is_none();

    let response = HealthResponse {
        healthy,
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mode: state.mode(),
        storage: state.storage(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        stats: if healthy { record_counts(state).await } else { None },
        error: db_error,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(&state.cors_origin, status, &response)
}

/// GET /version
pub fn version_info(state: &AppState) -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        git_commit: env!("GIT_COMMIT_SHORT"),
        git_commit_full: env!("GIT_COMMIT_FULL"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
    };
    json_response(&state.cors_origin, StatusCode::OK, &response)
}
