//! HTTP handlers for the `/api/auth` endpoints.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use super::AppState;
use super::gate::CurrentUser;
use super::response::{ApiResponse, ResponseCode};
use crate::auth::{LoginRequest, RefreshRequest, TokenPair};
use crate::db::UserProfile;

type HandlerResult<T> = Result<ApiResponse<T>, Response>;

/// Unwrap a JSON body, answering INVALID_REQUEST when it does not parse.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("rejected request body: {}", rejection.body_text());
        ApiResponse::error(ResponseCode::InvalidRequest, "Invalid request body").into_response()
    })
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> HandlerResult<TokenPair> {
    let request = json_body(payload)?;

    let pair = state
        .sessions
        .login(request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ApiResponse::success("Login successful", pair))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> HandlerResult<TokenPair> {
    let request = json_body(payload)?;

    let pair = state
        .sessions
        .refresh(request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ApiResponse::success("Token refreshed successfully", pair))
}

pub async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> HandlerResult<()> {
    let request = json_body(payload)?;

    state
        .sessions
        .logout(request)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ApiResponse::ok("Logged out successfully"))
}

pub async fn logout_all(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HandlerResult<()> {
    state
        .sessions
        .logout_all(user.user_id())
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ApiResponse::ok("Logged out from all devices successfully"))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HandlerResult<UserProfile> {
    let profile = state
        .sessions
        .me(user.user_id())
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(ApiResponse::success("", profile))
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Envelope for paths no handler serves.
pub async fn not_found() -> ApiResponse<()> {
    ApiResponse::error(ResponseCode::NotFound, "Route not found")
}
