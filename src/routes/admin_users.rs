//! Admin user management. Role checks happen in the user service against
//! the stored role, not the token.

use hyper::body::Body;
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

use crate::model::UserView;
use crate::routes::response::{authenticate, json_response, parse_json_body, BoxBody, BoxError};
use crate::server::AppState;
use crate::services::users::RoleChange;
use crate::types::Result;

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub message: String,
    pub user: UserView,
}

/// GET /api/admin/users
pub async fn list_users(state: &AppState, headers: &HeaderMap) -> Result<Response<BoxBody>> {
    let caller = authenticate(headers, state.jwt())?;
    let users = state.services.users.list_users(&caller).await?;
    Ok(json_response(&state.cors_origin, StatusCode::OK, &users))
}

/// PATCH /api/admin/users/{id}/role
pub async fn set_user_role<B>(
    state: &AppState,
    req: Request<B>,
    target_id: &str,
) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let caller = authenticate(req.headers(), state.jwt())?;
    let change: RoleChange = parse_json_body(req, state.args.max_body_bytes).await?;
    let user = state
        .services
        .users
        .set_role(&caller, target_id, change.role.as_deref())
        .await?;
    Ok(json_response(
        &state.cors_origin,
        StatusCode::OK,
        &RoleResponse {
            message: format!("User role updated to {}", user.role),
            user,
        },
    ))
}
