//! User directory endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::services::user::{CreateUserInput, UpdateAdministrationInput, UpdateProfileInput};
use appraisal_db::{
    entities::user::{self, UserRole},
    repositories::UserFilter,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Paging},
    middleware::AppState,
    response::{ApiResponse, Created},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    department: Option<String>,
    role: Option<UserRole>,
    is_active: Option<bool>,
}

async fn list_users(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<UserQuery>,
) -> AppResult<ApiResponse<Page<user::Model>>> {
    let filter = UserFilter {
        department: query.department,
        role: query.role,
        is_active: query.is_active,
        ..Default::default()
    };
    let users = state.user_service.list(&actor, filter, page).await?;
    Ok(ApiResponse::ok(users))
}

async fn me(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<user::Model>> {
    Ok(ApiResponse::ok(state.user_service.me(&actor).await?))
}

async fn get_user(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<user::Model>> {
    Ok(ApiResponse::ok(state.user_service.get(&actor, id).await?))
}

async fn direct_reports(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Vec<user::Model>>> {
    let reports = state.user_service.direct_reports(&actor, id).await?;
    Ok(ApiResponse::ok(reports))
}

async fn create_user(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Created<user::Model>> {
    let user = state.user_service.create(&actor, input).await?;
    Ok(Created::at("users", user.id, user))
}

async fn update_profile(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = state.user_service.update_profile(&actor, id, input).await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

async fn update_administration(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateAdministrationInput>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = state
        .user_service
        .update_administration(&actor, id, input)
        .await?;
    Ok(ApiResponse::ok(user).with_message("User updated"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me))
        .route("/{id}", get(get_user))
        .route("/{id}/direct-reports", get(direct_reports))
        .route("/{id}/profile", put(update_profile))
        .route("/{id}/administration", put(update_administration))
}
