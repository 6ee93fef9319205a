//! Manager review repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};

use crate::entities::{ManagerReview, manager_review, manager_review::AssessmentStatus};

/// Repository for manager review operations.
#[derive(Clone)]
pub struct ManagerReviewRepository {
    db: Arc<DatabaseConnection>,
}

impl ManagerReviewRepository {
    /// Create a new manager review repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find manager review by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<manager_review::Model>> {
        ManagerReview::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find manager review by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<manager_review::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Manager review {id}")))
    }

    /// Find the manager review of an appraisal.
    pub async fn find_by_appraisal<C: ConnectionTrait>(
        &self,
        conn: &C,
        appraisal_id: i32,
    ) -> AppResult<Option<manager_review::Model>> {
        ManagerReview::find()
            .filter(manager_review::Column::AppraisalId.eq(appraisal_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new manager review.
    pub async fn create(
        &self,
        model: manager_review::ActiveModel,
    ) -> AppResult<manager_review::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only while the review is still a draft.
    pub async fn update_draft<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        changes: manager_review::ActiveModel,
    ) -> AppResult<bool> {
        let result = ManagerReview::update_many()
            .set(changes)
            .filter(manager_review::Column::Id.eq(id))
            .filter(manager_review::Column::Status.eq(AssessmentStatus::Draft))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Re-open a submitted review for editing. `submitted_at` is kept.
    pub async fn reopen<C: ConnectionTrait>(&self, conn: &C, appraisal_id: i32) -> AppResult<u64> {
        let result = ManagerReview::update_many()
            .set(manager_review::ActiveModel {
                status: Set(AssessmentStatus::Draft),
                updated_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            })
            .filter(manager_review::Column::AppraisalId.eq(appraisal_id))
            .filter(manager_review::Column::Status.eq(AssessmentStatus::Submitted))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
