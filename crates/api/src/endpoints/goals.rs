//! Goal endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::services::goal::{CreateGoalInput, GoalProgressInput, UpdateGoalInput};
use appraisal_db::{
    entities::goal::{self, GoalStatus},
    repositories::GoalFilter,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, Paging},
    middleware::AppState,
    response::{ApiResponse, Created},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalQuery {
    employee_id: Option<i32>,
    appraisal_id: Option<i32>,
    status: Option<GoalStatus>,
}

async fn list_goals(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<GoalQuery>,
) -> AppResult<ApiResponse<Page<goal::Model>>> {
    let filter = GoalFilter {
        employee_id: query.employee_id,
        appraisal_id: query.appraisal_id,
        statuses: query.status.into_iter().collect(),
        ..Default::default()
    };
    Ok(ApiResponse::ok(
        state.goal_service.list(&actor, filter, page).await?,
    ))
}

async fn get_goal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<goal::Model>> {
    Ok(ApiResponse::ok(state.goal_service.get(&actor, id).await?))
}

async fn create_goal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGoalInput>,
) -> AppResult<Created<goal::Model>> {
    let goal = state.goal_service.create(&actor, input).await?;
    Ok(Created::at("goals", goal.id, goal))
}

async fn update_goal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateGoalInput>,
) -> AppResult<ApiResponse<goal::Model>> {
    let goal = state.goal_service.update(&actor, id, input).await?;
    Ok(ApiResponse::ok(goal).with_message("Goal updated"))
}

async fn delete_goal(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    state.goal_service.delete(&actor, id).await?;
    Ok(ApiResponse::message("Goal deleted"))
}

async fn update_progress(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<GoalProgressInput>,
) -> AppResult<ApiResponse<goal::Model>> {
    let goal = state.goal_service.update_progress(&actor, id, input).await?;
    Ok(ApiResponse::ok(goal).with_message("Progress updated"))
}

async fn start(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<goal::Model>> {
    Ok(ApiResponse::ok(state.goal_service.start(&actor, id).await?))
}

async fn complete(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<goal::Model>> {
    let goal = state.goal_service.complete(&actor, id).await?;
    Ok(ApiResponse::ok(goal).with_message("Goal completed"))
}

async fn cancel(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<goal::Model>> {
    let goal = state.goal_service.cancel(&actor, id).await?;
    Ok(ApiResponse::ok(goal).with_message("Goal cancelled"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route(
            "/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/{id}/progress", put(update_progress))
        .route("/{id}/start", post(start))
        .route("/{id}/complete", post(complete))
        .route("/{id}/cancel", post(cancel))
}
