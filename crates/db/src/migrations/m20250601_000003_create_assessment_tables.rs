//! Create self_assessment and manager_review tables migration.

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
                    .table(SelfAssessment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SelfAssessment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SelfAssessment::AppraisalId).integer().not_null())
                    .col(ColumnDef::new(SelfAssessment::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(SelfAssessment::Accomplishments).text().not_null())
                    .col(ColumnDef::new(SelfAssessment::Challenges).text().not_null())
                    .col(ColumnDef::new(SelfAssessment::GoalsAchieved).text().not_null())
                    .col(ColumnDef::new(SelfAssessment::FutureDevelopment).text().not_null())
                    .col(ColumnDef::new(SelfAssessment::SelfRating).double())
                    .col(ColumnDef::new(SelfAssessment::PerformanceRating).double())
                    .col(ColumnDef::new(SelfAssessment::TechnicalSkillsRating).double())
                    .col(ColumnDef::new(SelfAssessment::CommunicationRating).double())
                    .col(ColumnDef::new(SelfAssessment::TeamworkRating).double())
                    .col(ColumnDef::new(SelfAssessment::LeadershipRating).double())
                    .col(ColumnDef::new(SelfAssessment::AdditionalComments).text())
                    .col(ColumnDef::new(SelfAssessment::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(SelfAssessment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SelfAssessment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SelfAssessment::SubmittedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_self_assessment_appraisal")
                            .from(SelfAssessment::Table, SelfAssessment::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_self_assessment_employee")
                            .from(SelfAssessment::Table, SelfAssessment::EmployeeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one self-assessment per appraisal
        manager
            .create_index(
                Index::create()
                    .name("idx_self_assessment_appraisal_id")
                    .table(SelfAssessment::Table)
                    .col(SelfAssessment::AppraisalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManagerReview::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagerReview::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ManagerReview::AppraisalId).integer().not_null())
                    .col(ColumnDef::new(ManagerReview::ManagerId).integer().not_null())
                    .col(ColumnDef::new(ManagerReview::PerformanceRating).double().not_null())
                    .col(ColumnDef::new(ManagerReview::TechnicalSkillsRating).double().not_null())
                    .col(ColumnDef::new(ManagerReview::CommunicationRating).double().not_null())
                    .col(ColumnDef::new(ManagerReview::TeamworkRating).double().not_null())
                    .col(ColumnDef::new(ManagerReview::LeadershipRating).double().not_null())
                    .col(ColumnDef::new(ManagerReview::Strengths).text().not_null())
                    .col(ColumnDef::new(ManagerReview::AreasForImprovement).text().not_null())
                    .col(ColumnDef::new(ManagerReview::ManagerComments).text().not_null())
                    .col(ColumnDef::new(ManagerReview::RecommendedActions).text().not_null())
                    .col(ColumnDef::new(ManagerReview::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ManagerReview::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ManagerReview::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ManagerReview::SubmittedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_manager_review_appraisal")
                            .from(ManagerReview::Table, ManagerReview::AppraisalId)
                            .to(Appraisal::Table, Appraisal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_manager_review_manager")
                            .from(ManagerReview::Table, ManagerReview::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one manager review per appraisal
        manager
            .create_index(
                Index::create()
                    .name("idx_manager_review_appraisal_id")
                    .table(ManagerReview::Table)
                    .col(ManagerReview::AppraisalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ManagerReview::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SelfAssessment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SelfAssessment {
    Table,
    Id,
    AppraisalId,
    EmployeeId,
    Accomplishments,
    Challenges,
    GoalsAchieved,
    FutureDevelopment,
    SelfRating,
    PerformanceRating,
    TechnicalSkillsRating,
    CommunicationRating,
    TeamworkRating,
    LeadershipRating,
    AdditionalComments,
    Status,
    CreatedAt,
    UpdatedAt,
    SubmittedAt,
}

#[derive(Iden)]
enum ManagerReview {
    Table,
    Id,
    AppraisalId,
    ManagerId,
    PerformanceRating,
    TechnicalSkillsRating,
    CommunicationRating,
    TeamworkRating,
    LeadershipRating,
    Strengths,
    AreasForImprovement,
    ManagerComments,
    RecommendedActions,
    Status,
    CreatedAt,
    UpdatedAt,
    SubmittedAt,
}
