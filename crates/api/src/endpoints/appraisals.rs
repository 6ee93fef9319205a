//! Appraisal endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::scoring::Scorecard;
use appraisal_core::services::appraisal::{
    AppraisalActionInput, CreateAppraisalInput, UpdateAppraisalInput,
};
use appraisal_db::{
    entities::appraisal::{self, AppraisalStatus},
    repositories::AppraisalFilter,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Paging},
    middleware::AppState,
    response::{ApiResponse, Created},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppraisalQuery {
    employee_id: Option<i32>,
    manager_id: Option<i32>,
    status: Option<AppraisalStatus>,
    period_from: Option<NaiveDate>,
    period_to: Option<NaiveDate>,
}

impl From<AppraisalQuery> for AppraisalFilter {
    fn from(q: AppraisalQuery) -> Self {
        Self {
            employee_id: q.employee_id,
            manager_id: q.manager_id,
            statuses: q.status.into_iter().collect(),
            period_from: q.period_from,
            period_to: q.period_to,
            ..Default::default()
        }
    }
}

fn action_input(body: Option<Json<AppraisalActionInput>>) -> AppraisalActionInput {
    body.map(|Json(input)| input).unwrap_or_default()
}

async fn list_appraisals(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<AppraisalQuery>,
) -> AppResult<ApiResponse<Page<appraisal::Model>>> {
    let appraisals = state
        .appraisal_service
        .list(&actor, query.into(), page)
        .await?;
    Ok(ApiResponse::ok(appraisals))
}

async fn list_by_employee(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Path(employee_id): Path<i32>,
) -> AppResult<ApiResponse<Page<appraisal::Model>>> {
    let appraisals = state
        .appraisal_service
        .list_by_employee(&actor, employee_id, page)
        .await?;
    Ok(ApiResponse::ok(appraisals))
}

async fn list_by_manager(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Path(manager_id): Path<i32>,
) -> AppResult<ApiResponse<Page<appraisal::Model>>> {
    let appraisals = state
        .appraisal_service
        .list_by_manager(&actor, manager_id, page)
        .await?;
    Ok(ApiResponse::ok(appraisals))
}

async fn get_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<appraisal::Model>> {
    Ok(ApiResponse::ok(state.appraisal_service.get(&actor, id).await?))
}

async fn create_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateAppraisalInput>,
) -> AppResult<Created<appraisal::Model>> {
    let appraisal = state.appraisal_service.create(&actor, input).await?;
    Ok(Created::at("appraisals", appraisal.id, appraisal))
}

async fn update_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateAppraisalInput>,
) -> AppResult<ApiResponse<appraisal::Model>> {
    let appraisal = state.appraisal_service.update(&actor, id, input).await?;
    Ok(ApiResponse::ok(appraisal).with_message("Appraisal updated"))
}

async fn delete_appraisal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    state.appraisal_service.delete(&actor, id).await?;
    Ok(ApiResponse::message("Appraisal deleted"))
}

async fn approve(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<AppraisalActionInput>>,
) -> AppResult<ApiResponse<appraisal::Model>> {
    let appraisal = state
        .appraisal_service
        .approve(&actor, id, action_input(body))
        .await?;
    Ok(ApiResponse::ok(appraisal).with_message("Appraisal approved"))
}

async fn return_to_draft(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<AppraisalActionInput>>,
) -> AppResult<ApiResponse<appraisal::Model>> {
    let appraisal = state
        .appraisal_service
        .return_to_draft(&actor, id, action_input(body))
        .await?;
    Ok(ApiResponse::ok(appraisal).with_message("Appraisal returned for revision"))
}

async fn unlock(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<AppraisalActionInput>>,
) -> AppResult<ApiResponse<appraisal::Model>> {
    let appraisal = state
        .appraisal_service
        .unlock(&actor, id, action_input(body))
        .await?;
    Ok(ApiResponse::ok(appraisal).with_message("Appraisal unlocked"))
}

async fn scorecard(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Scorecard>> {
    Ok(ApiResponse::ok(
        state.appraisal_service.scorecard(&actor, id).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appraisals).post(create_appraisal))
        .route("/employee/{id}", get(list_by_employee))
        .route("/manager/{id}", get(list_by_manager))
        .route(
            "/{id}",
            get(get_appraisal)
                .put(update_appraisal)
                .delete(delete_appraisal),
        )
        .route("/{id}/approve", post(approve))
        .route("/{id}/return", post(return_to_draft))
        .route("/{id}/unlock", post(unlock))
        .route("/{id}/scorecard", get(scorecard))
}
