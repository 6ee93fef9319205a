//! Authentication endpoints.

use appraisal_common::AppResult;
use appraisal_core::services::auth::{ChangePasswordInput, LoginInput, LoginResponse, TokenPair};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let response = state.auth_service.login(input).await?;
    Ok(ApiResponse::ok(response).with_message("Login successful"))
}

async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let tokens = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(ApiResponse::ok(tokens))
}

async fn logout(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.auth_service.logout(&actor).await?;
    Ok(ApiResponse::message("Logged out"))
}

async fn change_password(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.auth_service.change_password(&actor, input).await?;
    Ok(ApiResponse::message("Password changed"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}
