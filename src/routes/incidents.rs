//! Incident endpoints
//!
//! Everything except anonymous creation requires a bearer token. Permission
//! checks live in the incident service; handlers only authenticate, decode
//! and shape responses.

use hyper::body::Body;
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

use crate::model::IncidentView;
use crate::routes::response::{
    authenticate, json_response, parse_json_body, BoxBody, BoxError, MessageResponse,
};
use crate::server::AppState;
use crate::services::validation::{AnonymousDraft, IncidentDraft, IncidentPatch, StatusChange};
use crate::types::Result;

const ANONYMOUS_NOTE: &str =
    "To track this incident's progress, please register/login with the email you provided (if any)";

#[derive(Debug, Serialize)]
pub struct IncidentResponse {
    pub message: &'static str,
    pub incident: IncidentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl IncidentResponse {
    fn new(message: &'static str, incident: IncidentView) -> Self {
        Self {
            message,
            incident,
            note: None,
        }
    }
}

/// GET /api/incidents
pub async fn list_incidents(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let incidents = state.services.incidents.list(&caller).await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &incidents))
}

/// POST /api/incidents
pub async fn create_incident<B>(state: &AppState, req: Request<B>) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let caller = authenticate(req.headers(), state.jwt())?;
    let draft: IncidentDraft = parse_json_body(req, state.args.max_body_bytes).await?;
    let incident = state.services.incidents.create(&caller, &draft).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::CREATED,
        &IncidentResponse::new("Incident created successfully", incident),
    ))
}

/// POST /api/incidents/anonymous
pub async fn create_anonymous_incident<B>(
    state: &AppState,
    req: Request<B>,
) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let draft: AnonymousDraft = parse_json_body(req, state.args.max_body_bytes).await?;
    let incident = state.services.incidents.create_anonymous(&draft).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::CREATED,
        &IncidentResponse {
            message: "Anonymous incident reported successfully",
            incident,
            note: Some(ANONYMOUS_NOTE),
        },
    ))
}

/// GET /api/incidents/stats
pub async fn incident_stats(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    authenticate(headers, state.jwt())?;
    let stats = state.services.incidents.stats().await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &stats))
}

/// GET /api/incidents/{id}
pub async fn get_incident(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let incident = state.services.incidents.read(&caller, id).await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &incident))
}

/// PUT /api/incidents/{id}
pub async fn update_incident<B>(
    state: &AppState,
    req: Request<B>,
    id: &str,
) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let caller = authenticate(req.headers(), state.jwt())?;
    let patch: IncidentPatch = parse_json_body(req, state.args.max_body_bytes).await?;
    let incident = state.services.incidents.update(&caller, id, &patch).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &IncidentResponse::new("Incident updated successfully", incident),
    ))
}

/// DELETE /api/incidents/{id}
pub async fn delete_incident(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    state.services.incidents.delete(&caller, id).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &MessageResponse::new("Incident deleted successfully"),
    ))
}

/// PATCH /api/incidents/{id}/status
pub async fn change_incident_status<B>(
    state: &AppState,
    req: Request<B>,
    id: &str,
) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let caller = authenticate(req.headers(), state.jwt())?;
    let change: StatusChange = parse_json_body(req, state.args.max_body_bytes).await?;
    let incident = state
        .services
        .incidents
        .change_status(&caller, id, change.status.as_deref())
        .await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &IncidentResponse::new("Status updated successfully", incident),
    ))
}
