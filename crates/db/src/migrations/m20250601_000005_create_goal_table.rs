//! Create goal table migration.

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
                    .table(Goal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Goal::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Goal::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Goal::AppraisalId).integer())
                    .col(ColumnDef::new(Goal::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Goal::Description).text().not_null())
                    .col(ColumnDef::new(Goal::TargetDate).date().not_null())
                    .col(ColumnDef::new(Goal::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Goal::Progress).integer().not_null().default(0))
                    .col(ColumnDef::new(Goal::Notes).text())
                    .col(
                        ColumnDef::new(Goal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Goal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Goal::Progress).between(0, 100))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goal_employee")
                            .from(Goal::Table, Goal::EmployeeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goal_appraisal")
                            .from(Goal::Table, Goal::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_goal_employee_id")
                    .table(Goal::Table)
                    .col(Goal::EmployeeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Goal::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Goal {
    Table,
    Id,
    EmployeeId,
    AppraisalId,
    Title,
    Description,
    TargetDate,
    Status,
    Progress,
    Notes,
    CreatedAt,
    UpdatedAt,
}
