//! Create appeal and mediation tables migration.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_user_table::User;
use super::m20250601_000002_create_appraisal_table::Appraisal;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Appeal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appeal::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Appeal::AppraisalId).integer().not_null())
                    .col(ColumnDef::new(Appeal::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Appeal::Reason).string_len(256).not_null())
                    .col(ColumnDef::new(Appeal::Details).text().not_null())
                    .col(ColumnDef::new(Appeal::Status).string_len(24).not_null())
                    .col(ColumnDef::new(Appeal::Priority).string_len(16).not_null())
                    .col(ColumnDef::new(Appeal::ReviewedById).integer())
                    .col(ColumnDef::new(Appeal::ReviewComments).text())
                    .col(ColumnDef::new(Appeal::Resolution).text())
                    .col(ColumnDef::new(Appeal::ReviewedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Appeal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Appeal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Appeal::SubmittedAt).timestamp_with_time_zone())
                    // Appeals are an audit trail: the appraisal cannot be deleted under them
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appeal_appraisal")
                            .from(Appeal::Table, Appeal::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appeal_employee")
                            .from(Appeal::Table, Appeal::EmployeeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appeal_reviewed_by")
                            .from(Appeal::Table, Appeal::ReviewedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appeal_appraisal_id")
                    .table(Appeal::Table)
                    .col(Appeal::AppraisalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appeal_status")
                    .table(Appeal::Table)
                    .col(Appeal::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Mediation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Mediation::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Mediation::AppealId).integer().not_null())
                    .col(ColumnDef::new(Mediation::HrRepresentativeId).integer().not_null())
                    .col(ColumnDef::new(Mediation::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Mediation::Location).string_len(256))
                    .col(ColumnDef::new(Mediation::MeetingLink).string_len(1024))
                    .col(ColumnDef::new(Mediation::Notes).text())
                    .col(ColumnDef::new(Mediation::Outcome).text())
                    .col(ColumnDef::new(Mediation::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Mediation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Mediation::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Mediation::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mediation_appeal")
                            .from(Mediation::Table, Mediation::AppealId)
                            .to(Appeal::Table, Appeal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mediation_hr_representative")
                            .from(Mediation::Table, Mediation::HrRepresentativeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mediation_appeal_id")
                    .table(Mediation::Table)
                    .col(Mediation::AppealId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Mediation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Appeal::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Appeal {
    Table,
    Id,
    AppraisalId,
    EmployeeId,
    Reason,
    Details,
    Status,
    Priority,
    ReviewedById,
    ReviewComments,
    Resolution,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
    SubmittedAt,
}

#[derive(Iden)]
enum Mediation {
    Table,
    Id,
    AppealId,
    HrRepresentativeId,
    ScheduledAt,
    Location,
    MeetingLink,
    Notes,
    Outcome,
    Status,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
