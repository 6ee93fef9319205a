//! Document repository.

use std::sync::Arc;

use appraisal_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::entities::{Document, document};

/// Repository for document metadata.
#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<DatabaseConnection>,
}

impl DocumentRepository {
    /// Create a new document repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find document by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<document::Model>> {
        Document::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find document by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<document::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {id}")))
    }

    /// Documents attached to an appraisal.
    pub async fn find_by_appraisal(&self, appraisal_id: i32) -> AppResult<Vec<document::Model>> {
        Document::find()
            .filter(document::Column::AppraisalId.eq(appraisal_id))
            .order_by_desc(document::Column::UploadedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Documents attached to an appeal.
    pub async fn find_by_appeal(&self, appeal_id: i32) -> AppResult<Vec<document::Model>> {
        Document::find()
            .filter(document::Column::AppealId.eq(appeal_id))
            .order_by_desc(document::Column::UploadedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Register a document.
    pub async fn create(&self, model: document::ActiveModel) -> AppResult<document::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a document record.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        Document::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
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
        let doc = fixtures::document(1, Some(11), Some(5), 7);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[doc]])
                .into_connection(),
        );

        let repo = DocumentRepository::new(db);
        let docs = repo.find_by_appeal(5).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].uploaded_by_id, 7);
    }
}
