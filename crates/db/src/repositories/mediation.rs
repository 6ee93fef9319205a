//! Mediation repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::{Mediation, mediation, mediation::MediationStatus};

/// Repository for mediation operations.
#[derive(Clone)]
pub struct MediationRepository {
    db: Arc<DatabaseConnection>,
}

impl MediationRepository {
    /// Create a new mediation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find mediation by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<mediation::Model>> {
        Mediation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find mediation by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<mediation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Mediation {id}")))
    }

    /// Mediations of an appeal, oldest first.
    pub async fn find_by_appeal(&self, appeal_id: i32) -> AppResult<Vec<mediation::Model>> {
        Mediation::find()
            .filter(mediation::Column::AppealId.eq(appeal_id))
            .order_by_asc(mediation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the completed mediations of an appeal.
    pub async fn count_completed<C: ConnectionTrait>(
        &self,
        conn: &C,
        appeal_id: i32,
    ) -> AppResult<u64> {
        Mediation::find()
            .filter(mediation::Column::AppealId.eq(appeal_id))
            .filter(mediation::Column::Status.eq(MediationStatus::Completed))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new mediation.
    pub async fn create(&self, model: mediation::ActiveModel) -> AppResult<mediation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the mediation is still in one of `from`.
    pub async fn update_if_status(
        &self,
        id: i32,
        from: &[MediationStatus],
        changes: mediation::ActiveModel,
    ) -> AppResult<bool> {
        let result = Mediation::update_many()
            .set(changes)
            .filter(mediation::Column::Id.eq(id))
            .filter(mediation::Column::Status.is_in(from.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_appeal() {
        let rows = [
            fixtures::mediation(1, 5, 30, MediationStatus::Completed),
            fixtures::mediation(2, 5, 30, MediationStatus::Pending),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = MediationRepository::new(db);
        let found = repo.find_by_appeal(5).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].status, MediationStatus::Completed);
    }
}
