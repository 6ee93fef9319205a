//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::EmployeeNumber).string_len(32).not_null())
                    .col(ColumnDef::new(User::Email).string_len(256).not_null())
                    .col(ColumnDef::new(User::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(User::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(User::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(User::Role).string_len(16).not_null())
                    .col(ColumnDef::new(User::Department).string_len(128))
                    .col(ColumnDef::new(User::JobTitle).string_len(128))
                    .col(ColumnDef::new(User::ManagerId).integer())
                    .col(ColumnDef::new(User::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(User::HireDate).date().not_null())
                    .col(ColumnDef::new(User::RefreshTokenHash).string_len(64))
                    .col(ColumnDef::new(User::RefreshTokenExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(User::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_manager")
                            .from(User::Table, User::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: employee_number
        manager
            .create_index(
                Index::create()
                    .name("idx_user_employee_number")
                    .table(User::Table)
                    .col(User::EmployeeNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: email
        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: manager_id (direct reports)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_manager_id")
                    .table(User::Table)
                    .col(User::ManagerId)
                    .to_owned(),
            )
            .await?;

        // Refresh tokens are looked up by digest
        manager
            .create_index(
                Index::create()
                    .name("idx_user_refresh_token_hash")
                    .table(User::Table)
                    .col(User::RefreshTokenHash)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum User {
    Table,
    Id,
    EmployeeNumber,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Role,
    Department,
    JobTitle,
    ManagerId,
    IsActive,
    HireDate,
    RefreshTokenHash,
    RefreshTokenExpiresAt,
    CreatedAt,
    UpdatedAt,
}
