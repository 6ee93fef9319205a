//! Appeal endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::services::appeal::{AppealDecisionInput, CreateAppealInput, UpdateAppealInput};
use appraisal_db::{
    entities::appeal::{self, AppealPriority, AppealStatus},
    repositories::AppealFilter,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Paging},
    middleware::AppState,
    response::{ApiResponse, Created},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppealQuery {
    appraisal_id: Option<i32>,
    employee_id: Option<i32>,
    status: Option<AppealStatus>,
    priority: Option<AppealPriority>,
    from: Option<DateTime<FixedOffset>>,
    to: Option<DateTime<FixedOffset>>,
}

impl From<AppealQuery> for AppealFilter {
    fn from(q: AppealQuery) -> Self {
        Self {
            appraisal_id: q.appraisal_id,
            employee_id: q.employee_id,
            statuses: q.status.into_iter().collect(),
            priority: q.priority,
            created_from: q.from,
            created_to: q.to,
            ..Default::default()
        }
    }
}

async fn list_appeals(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<AppealQuery>,
) -> AppResult<ApiResponse<Page<appeal::Model>>> {
    let appeals = state.appeal_service.list(&actor, query.into(), page).await?;
    Ok(ApiResponse::ok(appeals))
}

async fn get_appeal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<appeal::Model>> {
    Ok(ApiResponse::ok(state.appeal_service.get(&actor, id).await?))
}

async fn create_appeal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateAppealInput>,
) -> AppResult<Created<appeal::Model>> {
    let appeal = state.appeal_service.create(&actor, input).await?;
    Ok(Created::at("appeals", appeal.id, appeal))
}

async fn update_appeal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateAppealInput>,
) -> AppResult<ApiResponse<appeal::Model>> {
    let appeal = state.appeal_service.update(&actor, id, input).await?;
    Ok(ApiResponse::ok(appeal).with_message("Appeal updated"))
}

async fn submit(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<appeal::Model>> {
    let appeal = state.appeal_service.submit(&actor, id).await?;
    Ok(ApiResponse::ok(appeal).with_message("Appeal submitted"))
}

async fn start_review(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<appeal::Model>> {
    let appeal = state.appeal_service.start_review(&actor, id).await?;
    Ok(ApiResponse::ok(appeal).with_message("Appeal under review"))
}

async fn decide(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<AppealDecisionInput>,
) -> AppResult<ApiResponse<appeal::Model>> {
    let appeal = state.appeal_service.decide(&actor, id, input).await?;
    Ok(ApiResponse::ok(appeal).with_message("Appeal reviewed"))
}

async fn resolve(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<AppealDecisionInput>,
) -> AppResult<ApiResponse<appeal::Model>> {
    let appeal = state.appeal_service.resolve(&actor, id, input).await?;
    Ok(ApiResponse::ok(appeal).with_message("Appeal resolved"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appeals).post(create_appeal))
        .route("/{id}", get(get_appeal).put(update_appeal))
        .route("/{id}/submit", post(submit))
        .route("/{id}/start-review", post(start_review))
        .route("/{id}/review", post(decide))
        .route("/{id}/resolve", post(resolve))
}
