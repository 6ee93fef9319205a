//! Create meeting table migration.

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
                    .table(Meeting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Meeting::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Meeting::AppraisalId).integer().not_null())
                    .col(ColumnDef::new(Meeting::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Meeting::ManagerId).integer().not_null())
                    .col(
                        ColumnDef::new(Meeting::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Meeting::Location).string_len(256))
                    .col(ColumnDef::new(Meeting::MeetingLink).string_len(1024))
                    .col(ColumnDef::new(Meeting::Agenda).text().not_null())
                    .col(ColumnDef::new(Meeting::Notes).text())
                    .col(ColumnDef::new(Meeting::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Meeting::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Meeting::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Meeting::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_appraisal")
                            .from(Meeting::Table, Meeting::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_employee")
                            .from(Meeting::Table, Meeting::EmployeeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_manager")
                            .from(Meeting::Table, Meeting::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meeting_appraisal_id")
                    .table(Meeting::Table)
                    .col(Meeting::AppraisalId)
                    .to_owned(),
            )
            .await?;

        // Index: scheduled_at (upcoming meetings)
        manager
            .create_index(
                Index::create()
                    .name("idx_meeting_scheduled_at")
                    .table(Meeting::Table)
                    .col(Meeting::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meeting::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Meeting {
    Table,
    Id,
    AppraisalId,
    EmployeeId,
    ManagerId,
    ScheduledAt,
    Location,
    MeetingLink,
    Agenda,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
