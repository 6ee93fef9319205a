//! API endpoints.

mod appeals;
mod appraisals;
mod assessments;
mod auth;
mod dashboard;
mod documents;
mod goals;
mod mediations;
mod meetings;
mod notifications;
mod users;

use axum::{Json, Router};
use serde_json::{Value, json};

use crate::middleware::AppState;

/// Create the API router. Mounted under `/api` by the server.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/appraisals", appraisals::router())
        .nest("/self-assessments", assessments::self_assessment_router())
        .nest("/manager-reviews", assessments::manager_review_router())
        .nest("/meetings", meetings::router())
        .nest("/appeals", appeals::router())
        .nest("/mediations", mediations::router())
        .nest("/goals", goals::router())
        .nest("/documents", documents::router())
        .nest("/notifications", notifications::router())
        .nest("/dashboard", dashboard::router())
}

/// Liveness probe. Requires no authentication.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
