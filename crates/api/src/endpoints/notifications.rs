//! Notifications endpoints.

use appraisal_common::{AppResult, Page};
use appraisal_core::services::notification::SendNotificationInput;
use appraisal_db::entities::notification::{self, NotificationType};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, Paging},
    middleware::AppState,
    response::ApiResponse,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationQuery {
    #[serde(default)]
    unread_only: bool,
    #[serde(rename = "type")]
    kind: Option<NotificationType>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCount {
    unread_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkedRead {
    marked: u64,
}

async fn list_notifications(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Paging(page): Paging,
    Query(query): Query<NotificationQuery>,
) -> AppResult<ApiResponse<Page<notification::Model>>> {
    let notifications = state
        .notification_service
        .list(&actor, query.unread_only, query.kind, page)
        .await?;
    Ok(ApiResponse::ok(notifications))
}

async fn unread_count(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCount>> {
    let unread_count = state.notification_service.unread_count(&actor).await?;
    Ok(ApiResponse::ok(UnreadCount { unread_count }))
}

async fn send(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendNotificationInput>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.send(&actor, input).await?;
    Ok(ApiResponse::message("Notification sent"))
}

async fn mark_as_read(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<notification::Model>> {
    let notification = state.notification_service.mark_as_read(&actor, id).await?;
    Ok(ApiResponse::ok(notification))
}

async fn mark_all_as_read(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkedRead>> {
    let marked = state.notification_service.mark_all_as_read(&actor).await?;
    Ok(ApiResponse::ok(MarkedRead { marked }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(send))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_as_read))
        .route("/{id}/read", post(mark_as_read))
}
