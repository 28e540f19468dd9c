//! User endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::middleware::AUTH_COOKIE;
use super::{ApiError, AppState};
use crate::auth::{RequestContext, SigninRequest, SignupRequest};
use crate::models::{Role, UserResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

/// Register a new account (no auth required)
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = payload?;
    let user = state.users.signup(request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Sign in and receive a session token, also set as the `authToken` cookie
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (_, token) = state.users.signin(request).await?;

    let cookie = session_cookie(
        &token,
        state.users.tokens().expiry().num_seconds(),
        state.cookie_secure,
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("invalid cookie header: {}", e)))?;

    let mut response = Json(SigninResponse { token }).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}",
        AUTH_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Get the signed-in user
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get(ctx.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// List all users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list(&ctx).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Change a user's role (admin)
pub async fn set_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;

    let user = state.users.set_role(&ctx, id, request.role).await?;
    Ok(Json(UserResponse::from(&user)))
}
