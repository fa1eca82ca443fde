//! Notification inbox endpoints

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::response::{authenticate, json_response, BoxBody, MessageResponse};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub message: &'static str,
    pub count: u64,
}

/// GET /api/notifications
pub async fn inbox(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let inbox = state.services.notifications.inbox(&caller).await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &inbox))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    state.services.notifications.mark_read(&caller, id).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &MessageResponse::new("Notification marked as read"),
    ))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let count = state.services.notifications.mark_all_read(&caller).await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &MarkAllResponse {
            message: "All notifications marked as read",
            count,
        },
    ))
}
