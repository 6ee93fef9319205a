//! Mediation endpoints.

use appraisal_common::AppResult;
use appraisal_core::services::mediation::{
    CompleteMediationInput, CreateMediationInput, ScheduleMediationInput,
};
use appraisal_db::entities::mediation;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Created},
};

async fn get_mediation(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<mediation::Model>> {
    Ok(ApiResponse::ok(state.mediation_service.get(&actor, id).await?))
}

async fn list_by_appeal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(appeal_id): Path<i32>,
) -> AppResult<ApiResponse<Vec<mediation::Model>>> {
    let mediations = state
        .mediation_service
        .list_by_appeal(&actor, appeal_id)
        .await?;
    Ok(ApiResponse::ok(mediations))
}

async fn create_mediation(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateMediationInput>,
) -> AppResult<Created<mediation::Model>> {
    let mediation = state.mediation_service.create(&actor, input).await?;
    Ok(Created::at("mediations", mediation.id, mediation))
}

async fn schedule(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<ScheduleMediationInput>,
) -> AppResult<ApiResponse<mediation::Model>> {
    let mediation = state.mediation_service.schedule(&actor, id, input).await?;
    Ok(ApiResponse::ok(mediation).with_message("Mediation scheduled"))
}

async fn start(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<mediation::Model>> {
    let mediation = state.mediation_service.start(&actor, id).await?;
    Ok(ApiResponse::ok(mediation).with_message("Mediation started"))
}

async fn complete(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CompleteMediationInput>,
) -> AppResult<ApiResponse<mediation::Model>> {
    let mediation = state.mediation_service.complete(&actor, id, input).await?;
    Ok(ApiResponse::ok(mediation).with_message("Mediation completed"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_mediation))
        .route("/{id}", get(get_mediation))
        .route("/{id}/schedule", post(schedule))
        .route("/{id}/start", post(start))
        .route("/{id}/complete", post(complete))
        .route("/appeal/{id}", get(list_by_appeal))
}
