//! Document metadata. The files themselves live in external storage.

use appraisal_common::{AppError, AppResult};
use appraisal_db::{
    entities::{appraisal, document},
    repositories::{AppealRepository, AppraisalRepository, DocumentRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::policy::{self, Actor, AppraisalAction, Parties};

/// Input for registering an uploaded document.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDocumentInput {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,

    #[validate(length(min = 1, max = 1024))]
    pub storage_path: String,

    #[validate(length(min = 1, max = 127))]
    pub mime_type: String,

    #[validate(range(min = 1))]
    pub file_size: i64,

    pub appraisal_id: Option<i32>,
    pub appeal_id: Option<i32>,
}

/// Document service.
#[derive(Clone)]
pub struct DocumentService {
    appraisal_repo: AppraisalRepository,
    appeal_repo: AppealRepository,
    document_repo: DocumentRepository,
}

impl DocumentService {
    /// Create a new document service.
    #[must_use]
    pub const fn new(
        appraisal_repo: AppraisalRepository,
        appeal_repo: AppealRepository,
        document_repo: DocumentRepository,
    ) -> Self {
        Self {
            appraisal_repo,
            appeal_repo,
            document_repo,
        }
    }

    /// The appraisal a document hangs off, resolved through its appeal first.
    /// An explicit `appraisal_id` is not cross-checked here.
    async fn owning_appraisal(
        &self,
        appraisal_id: Option<i32>,
        appeal_id: Option<i32>,
    ) -> AppResult<Option<appraisal::Model>> {
        if let Some(appeal_id) = appeal_id {
            let appeal = self.appeal_repo.get_by_id(appeal_id).await?;
            return self
                .appraisal_repo
                .get_by_id(appeal.appraisal_id)
                .await
                .map(Some);
        }

        match appraisal_id {
            Some(id) => self.appraisal_repo.get_by_id(id).await.map(Some),
            None => Ok(None),
        }
    }

    fn check_visible(
        actor: &Actor,
        doc: &document::Model,
        appraisal: Option<&appraisal::Model>,
    ) -> AppResult<()> {
        let visible = match appraisal {
            Some(a) => policy::authorize(actor, AppraisalAction::View, Parties::from(a)).is_allowed(),
            None => policy::can_view_unlinked_document(actor, doc),
        };
        if visible {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Document {}", doc.id)))
        }
    }

    /// Get a document visible to the caller.
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<document::Model> {
        let doc = self
            .document_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {id}")))?;
        let appraisal = self.owning_appraisal(doc.appraisal_id, doc.appeal_id).await?;

        Self::check_visible(actor, &doc, appraisal.as_ref())?;
        Ok(doc)
    }

    /// Documents attached to an appraisal.
    pub async fn list_by_appraisal(
        &self,
        actor: &Actor,
        appraisal_id: i32,
    ) -> AppResult<Vec<document::Model>> {
        let appraisal = self.appraisal_repo.get_by_id(appraisal_id).await?;
        policy::authorize(actor, AppraisalAction::View, Parties::from(&appraisal))
            .check(|| format!("Appraisal {appraisal_id}"))?;

        self.document_repo.find_by_appraisal(appraisal_id).await
    }

    /// Documents attached to an appeal.
    pub async fn list_by_appeal(
        &self,
        actor: &Actor,
        appeal_id: i32,
    ) -> AppResult<Vec<document::Model>> {
        let appeal = self.appeal_repo.get_by_id(appeal_id).await?;
        let appraisal = self.appraisal_repo.get_by_id(appeal.appraisal_id).await?;
        policy::authorize(
            actor,
            AppraisalAction::View,
            policy::appeal_parties(&appeal, &appraisal),
        )
        .check(|| format!("Appeal {appeal_id}"))?;

        self.document_repo.find_by_appeal(appeal_id).await
    }

    /// Register a document the caller uploaded.
    pub async fn register(
        &self,
        actor: &Actor,
        input: RegisterDocumentInput,
    ) -> AppResult<document::Model> {
        input.validate()?;

        if let Some(appraisal) = self
            .owning_appraisal(input.appraisal_id, input.appeal_id)
            .await?
        {
            let what = || match input.appeal_id {
                Some(appeal_id) => format!("Appeal {appeal_id}"),
                None => format!("Appraisal {}", appraisal.id),
            };
            policy::authorize(actor, AppraisalAction::View, Parties::from(&appraisal))
                .check(what)?;

            if let Some(linked) = input.appraisal_id.filter(|id| *id != appraisal.id) {
                return Err(AppError::Validation(format!(
                    "Appeal {} does not belong to appraisal {linked}",
                    input.appeal_id.unwrap_or_default()
                )));
            }
        }

        let model = document::ActiveModel {
            file_name: Set(input.file_name),
            storage_path: Set(input.storage_path),
            mime_type: Set(input.mime_type),
            file_size: Set(input.file_size),
            appraisal_id: Set(input.appraisal_id),
            appeal_id: Set(input.appeal_id),
            uploaded_by_id: Set(actor.id),
            uploaded_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let doc = self.document_repo.create(model).await?;
        info!(document_id = doc.id, by = actor.id, "Document registered");
        Ok(doc)
    }

    /// Delete a document (uploader or HR/Admin).
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        let doc = self.get(actor, id).await?;
        if doc.uploaded_by_id != actor.id && !actor.is_elevated() {
            return Err(AppError::Forbidden(format!(
                "Only the uploader may delete document {id}"
            )));
        }

        self.document_repo.delete(id).await?;
        info!(document_id = id, by = actor.id, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::{appeal::AppealStatus, appraisal::AppraisalStatus, user::UserRole};
    use appraisal_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    const EMPLOYEE: i32 = 10;
    const MANAGER: i32 = 20;

    fn service(db: MockDatabase) -> DocumentService {
        let db: Arc<DatabaseConnection> = Arc::new(db.into_connection());
        DocumentService::new(
            AppraisalRepository::new(db.clone()),
            AppealRepository::new(db.clone()),
            DocumentRepository::new(db),
        )
    }

    fn input(appraisal_id: Option<i32>, appeal_id: Option<i32>) -> RegisterDocumentInput {
        RegisterDocumentInput {
            file_name: "evidence.pdf".to_string(),
            storage_path: "uploads/evidence.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            file_size: 1024,
            appraisal_id,
            appeal_id,
        }
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let mut input = input(None, None);
        input.file_size = 0;

        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .register(&Actor::new(EMPLOYEE, UserRole::Employee), input)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mismatched_links_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::appeal(3, 5, EMPLOYEE, AppealStatus::Submitted)]])
            .append_query_results([[fixtures::appraisal(
                5,
                EMPLOYEE,
                MANAGER,
                AppraisalStatus::Appealed,
            )]]);

        let result = service(db)
            .register(&Actor::new(EMPLOYEE, UserRole::Employee), input(Some(6), Some(3)))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_foreign_appeal_link_looks_missing() {
        let foreign = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::appeal(3, 5, 11, AppealStatus::Submitted)]])
            .append_query_results([[fixtures::appraisal(5, 11, 21, AppraisalStatus::Appealed)]]);
        let missing = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<appraisal_db::entities::appeal::Model>::new()]);

        let actor = Actor::new(EMPLOYEE, UserRole::Employee);
        let foreign = service(foreign).register(&actor, input(Some(6), Some(3))).await;
        let missing = service(missing).register(&actor, input(Some(6), Some(4))).await;

        assert!(matches!(foreign, Err(AppError::NotFound(_))));
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_on_own_appeal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::appeal(3, 5, EMPLOYEE, AppealStatus::Submitted)]])
            .append_query_results([[fixtures::appraisal(
                5,
                EMPLOYEE,
                MANAGER,
                AppraisalStatus::Appealed,
            )]])
            .append_query_results([[fixtures::document(9, Some(5), Some(3), EMPLOYEE)]]);

        let doc = service(db)
            .register(&Actor::new(EMPLOYEE, UserRole::Employee), input(Some(5), Some(3)))
            .await
            .unwrap();

        assert_eq!(doc.uploaded_by_id, EMPLOYEE);
    }

    #[tokio::test]
    async fn test_unlinked_document_hidden_from_others() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::document(9, None, None, EMPLOYEE)]]);

        let result = service(db)
            .get(&Actor::new(MANAGER, UserRole::Manager), 9)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_manager_cannot_delete_employee_upload() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::document(9, Some(5), None, EMPLOYEE)]])
            .append_query_results([[fixtures::appraisal(
                5,
                EMPLOYEE,
                MANAGER,
                AppraisalStatus::Completed,
            )]]);

        let result = service(db)
            .delete(&Actor::new(MANAGER, UserRole::Manager), 9)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_hr_deletes_any_document() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::document(9, None, None, EMPLOYEE)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        service(db)
            .delete(&Actor::new(1, UserRole::Hr), 9)
            .await
            .unwrap();
    }
}
