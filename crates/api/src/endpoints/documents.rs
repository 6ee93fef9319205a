//! Document metadata endpoints.

use appraisal_common::AppResult;
use appraisal_core::services::document::RegisterDocumentInput;
use appraisal_db::entities::document;
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

async fn get_document(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<document::Model>> {
    Ok(ApiResponse::ok(state.document_service.get(&actor, id).await?))
}

async fn list_by_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(appraisal_id): Path<i32>,
) -> AppResult<ApiResponse<Vec<document::Model>>> {
    let documents = state
        .document_service
        .list_by_appraisal(&actor, appraisal_id)
        .await?;
    Ok(ApiResponse::ok(documents))
}

async fn list_by_appeal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(appeal_id): Path<i32>,
) -> AppResult<ApiResponse<Vec<document::Model>>> {
    let documents = state
        .document_service
        .list_by_appeal(&actor, appeal_id)
        .await?;
    Ok(ApiResponse::ok(documents))
}

async fn register(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RegisterDocumentInput>,
) -> AppResult<Created<document::Model>> {
    let document = state.document_service.register(&actor, input).await?;
    Ok(Created::at("documents", document.id, document))
}

async fn delete_document(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    state.document_service.delete(&actor, id).await?;
    Ok(ApiResponse::message("Document deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/{id}", get(get_document).delete(delete_document))
        .route("/appraisal/{id}", get(list_by_appraisal))
        .route("/appeal/{id}", get(list_by_appeal))
}
