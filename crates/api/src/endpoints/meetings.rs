//! Meeting endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::services::meeting::{
    CompleteMeetingInput, CreateMeetingInput, RescheduleMeetingInput, UpdateMeetingInput,
};
use appraisal_db::{
    entities::meeting::{self, MeetingStatus},
    repositories::MeetingFilter,
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
struct MeetingQuery {
    appraisal_id: Option<i32>,
    employee_id: Option<i32>,
    manager_id: Option<i32>,
    status: Option<MeetingStatus>,
    from: Option<DateTime<FixedOffset>>,
    to: Option<DateTime<FixedOffset>>,
}

impl From<MeetingQuery> for MeetingFilter {
    fn from(q: MeetingQuery) -> Self {
        Self {
            appraisal_id: q.appraisal_id,
            employee_id: q.employee_id,
            manager_id: q.manager_id,
            statuses: q.status.into_iter().collect(),
            scheduled_from: q.from,
            scheduled_to: q.to,
            ..Default::default()
        }
    }
}

async fn list_meetings(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<MeetingQuery>,
) -> AppResult<ApiResponse<Page<meeting::Model>>> {
    let meetings = state
        .meeting_service
        .list(&actor, query.into(), page)
        .await?;
    Ok(ApiResponse::ok(meetings))
}

async fn get_meeting(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<meeting::Model>> {
    Ok(ApiResponse::ok(state.meeting_service.get(&actor, id).await?))
}

async fn create_meeting(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateMeetingInput>,
) -> AppResult<Created<meeting::Model>> {
    let meeting = state.meeting_service.create(&actor, input).await?;
    Ok(Created::at("meetings", meeting.id, meeting))
}

async fn update_meeting(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateMeetingInput>,
) -> AppResult<ApiResponse<meeting::Model>> {
    let meeting = state.meeting_service.update(&actor, id, input).await?;
    Ok(ApiResponse::ok(meeting).with_message("Meeting updated"))
}

async fn reschedule(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<RescheduleMeetingInput>,
) -> AppResult<ApiResponse<meeting::Model>> {
    let meeting = state.meeting_service.reschedule(&actor, id, input).await?;
    Ok(ApiResponse::ok(meeting).with_message("Meeting rescheduled"))
}

async fn complete(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<CompleteMeetingInput>>,
) -> AppResult<ApiResponse<meeting::Model>> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let meeting = state.meeting_service.complete(&actor, id, input).await?;
    Ok(ApiResponse::ok(meeting).with_message("Meeting completed"))
}

async fn cancel(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<meeting::Model>> {
    let meeting = state.meeting_service.cancel(&actor, id).await?;
    Ok(ApiResponse::ok(meeting).with_message("Meeting cancelled"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_meetings).post(create_meeting))
        .route("/{id}", get(get_meeting).put(update_meeting))
        .route("/{id}/reschedule", post(reschedule))
        .route("/{id}/complete", post(complete))
        .route("/{id}/cancel", post(cancel))
}
