//! Self-assessment repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};

use crate::entities::{SelfAssessment, self_assessment, self_assessment::AssessmentStatus};

/// Repository for self-assessment operations.
#[derive(Clone)]
pub struct SelfAssessmentRepository {
    db: Arc<DatabaseConnection>,
}

impl SelfAssessmentRepository {
    /// Create a new self-assessment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find self-assessment by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<self_assessment::Model>> {
        SelfAssessment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find self-assessment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<self_assessment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Self-assessment {id}")))
    }

    /// Find the self-assessment of an appraisal.
    pub async fn find_by_appraisal<C: ConnectionTrait>(
        &self,
        conn: &C,
        appraisal_id: i32,
    ) -> AppResult<Option<self_assessment::Model>> {
        SelfAssessment::find()
            .filter(self_assessment::Column::AppraisalId.eq(appraisal_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new self-assessment.
    pub async fn create(
        &self,
        model: self_assessment::ActiveModel,
    ) -> AppResult<self_assessment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only while the self-assessment is still a draft.
    pub async fn update_draft<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
        changes: self_assessment::ActiveModel,
    ) -> AppResult<bool> {
        let result = SelfAssessment::update_many()
            .set(changes)
            .filter(self_assessment::Column::Id.eq(id))
            .filter(self_assessment::Column::Status.eq(AssessmentStatus::Draft))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Re-open a submitted self-assessment for editing. `submitted_at` is kept.
    pub async fn reopen<C: ConnectionTrait>(&self, conn: &C, appraisal_id: i32) -> AppResult<u64> {
        let result = SelfAssessment::update_many()
            .set(self_assessment::ActiveModel {
                status: Set(AssessmentStatus::Draft),
                updated_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            })
            .filter(self_assessment::Column::AppraisalId.eq(appraisal_id))
            .filter(self_assessment::Column::Status.eq(AssessmentStatus::Submitted))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_appraisal() {
        let row = fixtures::self_assessment(3, 11, 7, AssessmentStatus::Submitted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = SelfAssessmentRepository::new(db.clone());
        let found = repo.find_by_appraisal(db.as_ref(), 11).await.unwrap().unwrap();

        assert_eq!(found.status, AssessmentStatus::Submitted);
        assert!(found.submitted_at.is_some());
    }

    #[tokio::test]
    async fn test_update_draft_rejected_after_submit() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = SelfAssessmentRepository::new(db.clone());
        let changes = self_assessment::ActiveModel {
            challenges: Set("late change".to_string()),
            ..Default::default()
        };

        assert!(!repo.update_draft(db.as_ref(), 3, changes).await.unwrap());
    }
}
