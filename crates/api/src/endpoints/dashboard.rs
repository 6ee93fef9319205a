//! Role dashboards.

use appraisal_common::AppResult;
use appraisal_core::services::dashboard::{EmployeeDashboard, HrDashboard, ManagerDashboard};
use axum::{Router, extract::State, routing::get};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

async fn hr(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<HrDashboard>> {
    Ok(ApiResponse::ok(state.dashboard_service.hr(&actor).await?))
}

async fn manager(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ManagerDashboard>> {
    Ok(ApiResponse::ok(state.dashboard_service.manager(&actor).await?))
}

async fn employee(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<EmployeeDashboard>> {
    Ok(ApiResponse::ok(state.dashboard_service.employee(&actor).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hr", get(hr))
        .route("/manager", get(manager))
        .route("/employee", get(employee))
}
