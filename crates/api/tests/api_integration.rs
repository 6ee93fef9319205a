//! API integration tests.
//!
//! These drive the assembled router against mock databases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use appraisal_api::{AppState, auth_middleware, health, router as api_router};
use appraisal_common::config::{
    AppraisalConfig, AuthConfig, Config, CorsConfig, DatabaseConfig, ServerConfig,
};
use appraisal_core::TokenService;
use appraisal_db::entities::{appraisal::AppraisalStatus, goal::GoalStatus, user::UserRole};
use appraisal_db::test_utils::fixtures;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    routing::get,
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

const EMPLOYEE: i32 = 10;
const MANAGER: i32 = 20;
const HR: i32 = 1;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "http://localhost:3000".to_string(),
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            issuer: "appraisal".to_string(),
            audience: "appraisal-api".to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
        },
        cors: CorsConfig::default(),
        appraisal: AppraisalConfig::default(),
    }
}

/// Assemble the app the way the server does, over the given mock.
fn create_test_router(db: MockDatabase) -> Router {
    let state = AppState::new(Arc::new(db.into_connection()), &create_test_config());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn bearer(id: i32, role: UserRole) -> String {
    let token = TokenService::new(&create_test_config().auth)
        .issue_access_token(&fixtures::user(id, role, None))
        .unwrap();
    format!("Bearer {token}")
}

fn get_as(uri: &str, auth: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, auth: String, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let response = create_test_router(empty_db())
        .oneshot(get_as("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_returns_401_envelope() {
    let response = create_test_router(empty_db())
        .oneshot(get_as("/api/appraisals", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let response = create_test_router(empty_db())
        .oneshot(get_as(
            "/api/users/me",
            Some("Bearer not.a.jwt".to_string()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_employee_filtering_on_another_employee_gets_empty_page() {
    // No mock rows: the scope check answers without touching the database.
    let response = create_test_router(empty_db())
        .oneshot(get_as(
            "/api/appraisals?employeeId=99&pageSize=5",
            Some(bearer(EMPLOYEE, UserRole::Employee)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["totalCount"], 0);
    assert_eq!(body["data"]["pageSize"], 5);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_employee_cannot_open_hr_dashboard() {
    let response = create_test_router(empty_db())
        .oneshot(get_as(
            "/api/dashboard/hr",
            Some(bearer(EMPLOYEE, UserRole::Employee)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_appraisal_of_someone_else_is_not_found() {
    let db = empty_db().append_query_results([[fixtures::appraisal(
        5,
        77,
        MANAGER,
        AppraisalStatus::Draft,
    )]]);

    let response = create_test_router(db)
        .oneshot(get_as(
            "/api/appraisals/5",
            Some(bearer(EMPLOYEE, UserRole::Employee)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hr_reads_any_appraisal() {
    let db = empty_db().append_query_results([[fixtures::appraisal(
        5,
        EMPLOYEE,
        MANAGER,
        AppraisalStatus::UnderReview,
    )]]);

    let response = create_test_router(db)
        .oneshot(get_as("/api/appraisals/5", Some(bearer(HR, UserRole::Hr))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 5);
    assert_eq!(body["data"]["status"], "UnderReview");
}

#[tokio::test]
async fn test_create_appraisal_with_same_employee_and_manager_is_400() {
    let response = create_test_router(empty_db())
        .oneshot(post_json(
            "/api/appraisals",
            bearer(HR, UserRole::Hr),
            r#"{"employeeId":10,"managerId":10,"reviewPeriodStart":"2024-01-01","reviewPeriodEnd":"2024-12-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["errors"][0], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_goal_returns_201_with_location() {
    let db = empty_db()
        .append_query_results([[fixtures::user(EMPLOYEE, UserRole::Employee, Some(MANAGER))]])
        .append_query_results([[fixtures::goal(3, EMPLOYEE, GoalStatus::NotStarted, 0)]]);

    let response = create_test_router(db)
        .oneshot(post_json(
            "/api/goals",
            bearer(EMPLOYEE, UserRole::Employee),
            r#"{"employeeId":10,"title":"Ship the billing rewrite","description":"","targetDate":"2025-06-30"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/goals/3"
    );
}
