//! Create appraisal table migration.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_user_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Appraisal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appraisal::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Appraisal::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Appraisal::ManagerId).integer().not_null())
                    .col(ColumnDef::new(Appraisal::ReviewPeriodStart).date().not_null())
                    .col(ColumnDef::new(Appraisal::ReviewPeriodEnd).date().not_null())
                    .col(ColumnDef::new(Appraisal::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Appraisal::OverallRating).double())
                    .col(ColumnDef::new(Appraisal::Comments).text())
                    .col(
                        ColumnDef::new(Appraisal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Appraisal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Appraisal::CompletedAt).timestamp_with_time_zone())
                    .check(
                        Expr::col(Appraisal::ReviewPeriodStart)
                            .lt(Expr::col(Appraisal::ReviewPeriodEnd)),
                    )
                    .check(
                        Expr::col(Appraisal::EmployeeId).ne(Expr::col(Appraisal::ManagerId)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appraisal_employee")
                            .from(Appraisal::Table, Appraisal::EmployeeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appraisal_manager")
                            .from(Appraisal::Table, Appraisal::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appraisal_employee_id")
                    .table(Appraisal::Table)
                    .col(Appraisal::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appraisal_manager_id")
                    .table(Appraisal::Table)
                    .col(Appraisal::ManagerId)
                    .to_owned(),
            )
            .await?;

        // Index: status (dashboards count by status)
        manager
            .create_index(
                Index::create()
                    .name("idx_appraisal_status")
                    .table(Appraisal::Table)
                    .col(Appraisal::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Appraisal::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Appraisal {
    Table,
    Id,
    EmployeeId,
    ManagerId,
    ReviewPeriodStart,
    ReviewPeriodEnd,
    Status,
    OverallRating,
    Comments,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
