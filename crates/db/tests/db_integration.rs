//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `appraisal_test`)
//!   `TEST_DB_PASSWORD` (default: `appraisal_test`)
//!   `TEST_DB_NAME` (default: `appraisal_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use appraisal_common::PageRequest;
use appraisal_db::entities::{
    appeal, appraisal::AppraisalStatus, user::UserRole, Appeal, Appraisal, SelfAssessment,
};
use appraisal_db::repositories::{AppraisalFilter, AppraisalRepository};
use appraisal_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_apply() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let count = Appraisal::find().all(db.connection()).await.unwrap().len();
    assert_eq!(count, 0);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_status_compare_and_set_fires_once() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let manager = db.seed_user("M001", UserRole::Manager, None).await.unwrap();
    let employee = db.seed_user("E001", UserRole::Employee, Some(manager.id)).await.unwrap();
    let appraisal = db.seed_appraisal(employee.id, manager.id).await.unwrap();

    let conn = Arc::new(sea_orm::DatabaseConnection::from(db.conn.get_postgres_connection_pool().clone()));
    let repo = AppraisalRepository::new(conn.clone());
    let from = [AppraisalStatus::Draft, AppraisalStatus::Submitted];
    let changes = || appraisal_db::entities::appraisal::ActiveModel {
        status: Set(AppraisalStatus::UnderReview),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    let first = repo.update_if_status(conn.as_ref(), appraisal.id, &from, changes()).await.unwrap();
    let second = repo.update_if_status(conn.as_ref(), appraisal.id, &from, changes()).await.unwrap();

    assert!(first);
    assert!(!second);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_participant_filter() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let manager = db.seed_user("M001", UserRole::Manager, None).await.unwrap();
    let other_manager = db.seed_user("M002", UserRole::Manager, None).await.unwrap();
    let employee = db.seed_user("E001", UserRole::Employee, Some(manager.id)).await.unwrap();
    db.seed_appraisal(employee.id, manager.id).await.unwrap();

    let repo = AppraisalRepository::new(Arc::new(sea_orm::DatabaseConnection::from(db.conn.get_postgres_connection_pool().clone())));
    let page = PageRequest::clamped(None, None, 10, 100);

    let mine = AppraisalFilter {
        participant_id: Some(manager.id),
        ..Default::default()
    };
    let theirs = AppraisalFilter {
        employee_id: Some(employee.id),
        participant_id: Some(other_manager.id),
        ..Default::default()
    };

    assert_eq!(repo.find_page(&mine, page).await.unwrap().total_count, 1);
    assert_eq!(repo.find_page(&theirs, page).await.unwrap().total_count, 0);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_appeal_restricts_appraisal_delete() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let manager = db.seed_user("M001", UserRole::Manager, None).await.unwrap();
    let employee = db.seed_user("E001", UserRole::Employee, Some(manager.id)).await.unwrap();
    let appraisal = db.seed_appraisal(employee.id, manager.id).await.unwrap();

    appeal::ActiveModel {
        appraisal_id: Set(appraisal.id),
        employee_id: Set(employee.id),
        reason: Set("Rating".to_string()),
        details: Set("Details".to_string()),
        status: Set(appeal::AppealStatus::Draft),
        priority: Set(appeal::AppealPriority::Low),
        reviewed_by_id: Set(None),
        review_comments: Set(None),
        resolution: Set(None),
        reviewed_at: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
        submitted_at: Set(None),
        ..Default::default()
    }
    .insert(db.connection())
    .await
    .unwrap();

    let result = Appraisal::delete_by_id(appraisal.id).exec(db.connection()).await;
    assert!(result.is_err(), "appeal must block appraisal deletion");

    Appeal::delete_many().exec(db.connection()).await.unwrap();
    Appraisal::delete_by_id(appraisal.id).exec(db.connection()).await.unwrap();
    assert!(SelfAssessment::find().all(db.connection()).await.unwrap().is_empty());
    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
