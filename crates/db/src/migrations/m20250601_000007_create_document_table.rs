//! Create document table migration.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_user_table::User;
use super::m20250601_000002_create_appraisal_table::Appraisal;
use super::m20250601_000006_create_appeal_tables::Appeal;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Document::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Document::FileName).string_len(256).not_null())
                    .col(ColumnDef::new(Document::StoragePath).string_len(1024).not_null())
                    .col(ColumnDef::new(Document::MimeType).string_len(128).not_null())
                    .col(ColumnDef::new(Document::FileSize).big_integer().not_null())
                    .col(ColumnDef::new(Document::AppraisalId).integer())
                    .col(ColumnDef::new(Document::AppealId).integer())
                    .col(ColumnDef::new(Document::UploadedById).integer().not_null())
                    .col(
                        ColumnDef::new(Document::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_appraisal")
                            .from(Document::Table, Document::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_appeal")
                            .from(Document::Table, Document::AppealId)
                            .to(Appeal::Table, Appeal::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_uploaded_by")
                            .from(Document::Table, Document::UploadedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_appraisal_id")
                    .table(Document::Table)
                    .col(Document::AppraisalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_appeal_id")
                    .table(Document::Table)
                    .col(Document::AppealId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Document::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Document {
    Table,
    Id,
    FileName,
    StoragePath,
    MimeType,
    FileSize,
    AppraisalId,
    AppealId,
    UploadedById,
    UploadedAt,
}
