//! Self-assessment and manager review endpoints.

use appraisal_common::AppResult;
use appraisal_core::services::assessment::{
    CreateManagerReviewInput, CreateSelfAssessmentInput, ManagerReviewContent,
    SelfAssessmentContent, Submission,
};
use appraisal_db::entities::{manager_review, self_assessment};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Created},
};

fn submitted<T: Serialize>(submission: Submission<T>) -> ApiResponse<Submission<T>> {
    let message = if submission.advanced {
        "Submitted; appraisal moved to review"
    } else if submission.awaiting.is_empty() {
        "Submitted"
    } else {
        "Submitted; waiting for the other party"
    };
    ApiResponse::ok(submission).with_message(message)
}

// === Self-assessments ===

async fn get_self_assessment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<self_assessment::Model>> {
    let item = state
        .assessment_service
        .get_self_assessment(&actor, id)
        .await?;
    Ok(ApiResponse::ok(item))
}

async fn get_self_assessment_by_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(appraisal_id): Path<i32>,
) -> AppResult<ApiResponse<self_assessment::Model>> {
    let item = state
        .assessment_service
        .get_self_assessment_by_appraisal(&actor, appraisal_id)
        .await?;
    Ok(ApiResponse::ok(item))
}

async fn create_self_assessment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateSelfAssessmentInput>,
) -> AppResult<Created<self_assessment::Model>> {
    let item = state
        .assessment_service
        .create_self_assessment(&actor, input)
        .await?;
    Ok(Created::at("self-assessments", item.id, item))
}

async fn update_self_assessment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(content): Json<SelfAssessmentContent>,
) -> AppResult<ApiResponse<self_assessment::Model>> {
    let item = state
        .assessment_service
        .update_self_assessment(&actor, id, content)
        .await?;
    Ok(ApiResponse::ok(item).with_message("Self-assessment saved"))
}

async fn submit_self_assessment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Submission<self_assessment::Model>>> {
    let submission = state
        .assessment_service
        .submit_self_assessment(&actor, id)
        .await?;
    Ok(submitted(submission))
}

pub fn self_assessment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_self_assessment))
        .route(
            "/{id}",
            get(get_self_assessment).put(update_self_assessment),
        )
        .route("/{id}/submit", post(submit_self_assessment))
        .route("/appraisal/{id}", get(get_self_assessment_by_appraisal))
}

// === Manager reviews ===

async fn get_manager_review(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<manager_review::Model>> {
    let item = state
        .assessment_service
        .get_manager_review(&actor, id)
        .await?;
    Ok(ApiResponse::ok(item))
}

async fn get_manager_review_by_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(appraisal_id): Path<i32>,
) -> AppResult<ApiResponse<manager_review::Model>> {
    let item = state
        .assessment_service
        .get_manager_review_by_appraisal(&actor, appraisal_id)
        .await?;
    Ok(ApiResponse::ok(item))
}

async fn create_manager_review(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateManagerReviewInput>,
) -> AppResult<Created<manager_review::Model>> {
    let item = state
        .assessment_service
        .create_manager_review(&actor, input)
        .await?;
    Ok(Created::at("manager-reviews", item.id, item))
}

async fn update_manager_review(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(content): Json<ManagerReviewContent>,
) -> AppResult<ApiResponse<manager_review::Model>> {
    let item = state
        .assessment_service
        .update_manager_review(&actor, id, content)
        .await?;
    Ok(ApiResponse::ok(item).with_message("Manager review saved"))
}

async fn submit_manager_review(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Submission<manager_review::Model>>> {
    let submission = state
        .assessment_service
        .submit_manager_review(&actor, id)
        .await?;
    Ok(submitted(submission))
}

pub fn manager_review_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_manager_review))
        .route("/{id}", get(get_manager_review).put(update_manager_review))
        .route("/{id}/submit", post(submit_manager_review))
        .route("/appraisal/{id}", get(get_manager_review_by_appraisal))
}
